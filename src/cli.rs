// Command-line front end
// Every command maps to a screen route; the route guard runs before the
// command and an expired session sends the user back to login.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dialoguer::{Confirm, Password};
use std::path::PathBuf;

use crate::access::{self, Access, Route};
use crate::catalog::{CatalogClient, CategoryDraft, ImageUpload, ProductDraft};
use crate::error::ApiError;
use crate::format::format_inr;
use crate::listing::{paginate, search, Page};
use crate::models::{Product, UserUpdate};
use crate::session::{Role, SessionManager, SessionRecord, UserInfo};
use crate::validation::{ForgotPasswordForm, LoginForm, ResetPasswordForm, SignupForm};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write backend settings to .env
    Setup,

    /// Log in and keep the session for later commands
    Login {
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a new user account
    Signup { name: String, email: String },

    /// End the session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show the dashboard entries available to your role
    Dashboard,

    /// Renew the access token now
    Refresh,

    /// Set a new password without the old one
    ForgotPassword { email: String },

    /// Change your password
    ResetPassword {
        /// Account email (defaults to the logged-in user)
        email: Option<String>,
    },

    /// Browse and manage products
    #[command(subcommand)]
    Products(ProductsCommand),

    /// Browse and manage categories (admin)
    #[command(subcommand)]
    Categories(CategoriesCommand),

    /// Manage user accounts (admin)
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive search term
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = 10)]
    pub per_page: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ProductArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub category_id: Option<i64>,
    /// One of Black, White, Yellow, Green, Blue, Red
    #[arg(long)]
    pub color: Option<String>,
    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ProductsCommand {
    /// List all products
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Only products of this category
        #[arg(long)]
        category: Option<String>,
    },
    /// List the products you created (sub-admin)
    Mine {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        category: Option<String>,
    },
    Add(ProductArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: ProductArgs,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: PathBuf,
    },
    Edit {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: PathBuf,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// user, sub-admin or admin
        #[arg(long)]
        role: Option<Role>,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

impl Command {
    /// Screen the command belongs to
    pub fn route(&self) -> Route {
        match self {
            Command::Setup => Route::Root,
            Command::Login { .. } => Route::Login,
            Command::Signup { .. } => Route::Signup,
            Command::ForgotPassword { .. } => Route::ForgetPassword,
            Command::ResetPassword { .. } => Route::ResetPassword,
            Command::Logout | Command::Whoami | Command::Dashboard | Command::Refresh => Route::Dashboard,
            Command::Products(ProductsCommand::Mine { .. }) => Route::SubAdminProducts,
            Command::Products(_) => Route::Products,
            Command::Categories(_) => Route::Categories,
            Command::Users(_) => Route::AllUsers,
        }
    }
}

/// Runs commands against one session
pub struct App {
    sessions: SessionManager,
    catalog: CatalogClient,
}

impl App {
    pub fn new(sessions: SessionManager, catalog: CatalogClient) -> Self {
        Self { sessions, catalog }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        let route = command.route();
        let session = self.sessions.restore();

        if !matches!(command, Command::Setup) {
            if let Access::Redirect(target) = access::guard(route, &session) {
                return Err(redirect_error(route, target, &session));
            }
        }

        let result = self.execute(command, &session).await;

        if let Err(ref e) = result {
            let expired = e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_expired);
            if expired {
                if let Some(target) = access::after_session_expired(route) {
                    tracing::info!(from = %route, to = %target, "Session expired, redirecting");
                    eprintln!("Your session has expired. Run `catalog-admin login` to continue.");
                }
            }
        }
        result
    }

    async fn execute(&self, command: Command, session: &SessionRecord) -> Result<()> {
        match command {
            // Handled by main before the session layer is built
            Command::Setup => Ok(()),
            Command::Login { email, password } => self.login(email, password).await,
            Command::Signup { name, email } => self.signup(name, email).await,
            Command::Logout => {
                self.sessions.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Command::Whoami => {
                if let Some(ref user) = session.user_info {
                    print_user(user);
                }
                Ok(())
            }
            Command::Dashboard => {
                if let Some(ref user) = session.user_info {
                    print_user(user);
                    println!();
                    for route in access::navigation(user.role) {
                        println!("  {:<20} {}", route.label(), route.path());
                    }
                }
                Ok(())
            }
            Command::Refresh => {
                self.sessions.refresh().await?;
                println!("Session renewed");
                Ok(())
            }
            Command::ForgotPassword { email } => {
                let password = prompt_password("New password")?;
                let message = self
                    .sessions
                    .forgot_password(&ForgotPasswordForm { email, password })
                    .await?;
                println!("{}", message.message.as_deref().unwrap_or("Password updated"));
                Ok(())
            }
            Command::ResetPassword { email } => {
                let email = email
                    .or_else(|| session.user_info.as_ref().map(|u| u.email.clone()))
                    .context("Pass the account email or log in first")?;
                let form = ResetPasswordForm {
                    email,
                    old_password: prompt_password("Old password")?,
                    new_password: prompt_password("New password")?,
                    confirm_new_password: prompt_password("Confirm new password")?,
                };
                let message = self.sessions.reset_password(&form).await?;
                println!("{}", message.message.as_deref().unwrap_or("Password changed"));
                Ok(())
            }
            Command::Products(cmd) => self.products(cmd, session).await,
            Command::Categories(cmd) => self.categories(cmd).await,
            Command::Users(cmd) => self.users(cmd).await,
        }
    }

    async fn login(&self, email: String, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(p) => p,
            None => prompt_password("Password")?,
        };
        let outcome = self.sessions.login(&LoginForm { email, password }).await?;
        println!("{}", outcome.message.as_deref().unwrap_or("Login successful"));
        if let Some(ref user) = outcome.session.user_info {
            print_user(user);
        }
        Ok(())
    }

    async fn signup(&self, name: String, email: String) -> Result<()> {
        let form = SignupForm {
            name,
            email,
            password: prompt_password("Password")?,
            confirm_password: prompt_password("Confirm password")?,
        };
        let message = self.sessions.signup(&form).await?;
        println!("{}", message.message.as_deref().unwrap_or("Account created"));
        println!("You can now log in with `catalog-admin login`.");
        Ok(())
    }

    async fn products(&self, cmd: ProductsCommand, session: &SessionRecord) -> Result<()> {
        let user = session.user_info.as_ref().context("Not logged in")?;

        match cmd {
            ProductsCommand::List { list, category } => {
                let products = self.catalog.list_products().await?;
                let shown: Vec<Product> = products
                    .into_iter()
                    .filter(|p| !p.is_deleted)
                    .filter(|p| category.as_deref().map_or(true, |c| p.category_name() == Some(c)))
                    .collect();
                print_products(list_page(&shown, &list));
            }
            ProductsCommand::Mine { list, category } => {
                let products = self.catalog.list_products().await?;
                let mine: Vec<Product> = access::visible_products(&products, user, category.as_deref())
                    .into_iter()
                    .cloned()
                    .collect();
                print_products(list_page(&mine, &list));
            }
            ProductsCommand::Add(fields) => {
                if !access::can_manage_products(user.role) {
                    return Err(ApiError::Forbidden("Only admins and sub-admins can add products".to_string()).into());
                }
                let draft = ProductDraft {
                    name: fields.name.unwrap_or_default(),
                    price: fields.price.unwrap_or_default(),
                    category_id: fields.category_id,
                    color: fields.color.unwrap_or_default(),
                    tags: fields.tags.unwrap_or_default(),
                    image: load_image(fields.image).await?,
                };
                let message = self.catalog.create_product(&draft).await?;
                println!("{}", message.message.as_deref().unwrap_or("Product created"));
            }
            ProductsCommand::Edit { id, fields } => {
                let existing = self.owned_product(id, user, "edit").await?;
                let draft = ProductDraft {
                    name: fields.name.unwrap_or(existing.name),
                    price: fields.price.unwrap_or(existing.price),
                    category_id: fields.category_id.or(existing.category_id),
                    color: fields
                        .color
                        .or_else(|| existing.colors.into_iter().next())
                        .unwrap_or_default(),
                    tags: fields.tags.unwrap_or(existing.tags),
                    image: load_image(fields.image).await?,
                };
                let message = self.catalog.update_product(id, &draft).await?;
                println!("{}", message.message.as_deref().unwrap_or("Product updated"));
            }
            ProductsCommand::Delete { id, yes } => {
                let existing = self.owned_product(id, user, "delete").await?;
                if !yes && !confirm(&format!("Delete product \"{}\"?", existing.name))? {
                    return Ok(());
                }
                let message = self.catalog.delete_product(id).await?;
                println!("{}", message.message.as_deref().unwrap_or("Product deleted successfully"));
            }
        }
        Ok(())
    }

    /// Fetch a product and check the user may change it
    async fn owned_product(&self, id: i64, user: &UserInfo, action: &str) -> Result<Product> {
        let product = self
            .catalog
            .list_products()
            .await?
            .into_iter()
            .find(|p| p.id == id && !p.is_deleted)
            .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))?;

        if !access::can_modify_product(user, &product) {
            return Err(ApiError::Forbidden(format!("You can only {} your own products", action)).into());
        }
        Ok(product)
    }

    async fn categories(&self, cmd: CategoriesCommand) -> Result<()> {
        match cmd {
            CategoriesCommand::List { list } => {
                let categories = self.catalog.list_categories().await?;
                let page = list_page(&categories, &list);
                for category in &page.items {
                    println!("{:>5}  {}", category.id, category.name);
                }
                print_footer(&page);
            }
            CategoriesCommand::Add { name, image } => {
                let draft = CategoryDraft {
                    name,
                    image: Some(ImageUpload::from_path(&image).await?),
                };
                let message = self.catalog.create_category(&draft).await?;
                println!("{}", message.message.as_deref().unwrap_or("Category created"));
            }
            CategoriesCommand::Edit { id, name, image } => {
                let draft = CategoryDraft {
                    name,
                    image: Some(ImageUpload::from_path(&image).await?),
                };
                let message = self.catalog.update_category(id, &draft).await?;
                println!("{}", message.message.as_deref().unwrap_or("Category updated"));
            }
            CategoriesCommand::Delete { id, yes } => {
                if !yes && !confirm(&format!("Delete category {}?", id))? {
                    return Ok(());
                }
                let message = self.catalog.delete_category(id).await?;
                println!("{}", message.message.as_deref().unwrap_or("Category deleted"));
            }
        }
        Ok(())
    }

    async fn users(&self, cmd: UsersCommand) -> Result<()> {
        match cmd {
            UsersCommand::List { list } => {
                let users = self.catalog.list_users().await?;
                let page = list_page(&users, &list);
                for user in &page.items {
                    println!("{:>5}  {:<24} {:<32} {}", user.id, user.name, user.email, user.role);
                }
                print_footer(&page);
            }
            UsersCommand::Update { id, name, email, role } => {
                let existing = self
                    .catalog
                    .list_users()
                    .await?
                    .into_iter()
                    .find(|u| u.id == id)
                    .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
                let update = UserUpdate {
                    name: name.unwrap_or(existing.name),
                    email: email.unwrap_or(existing.email),
                    role: role.unwrap_or(existing.role),
                };
                let message = self.catalog.update_user(id, &update).await?;
                println!("{}", message.message.as_deref().unwrap_or("User updated"));
            }
            UsersCommand::Delete { id, yes } => {
                if !yes && !confirm(&format!("Delete user {}?", id))? {
                    return Ok(());
                }
                let message = self.catalog.delete_user(id).await?;
                println!("{}", message.message.as_deref().unwrap_or("User deleted"));
            }
        }
        Ok(())
    }
}

fn redirect_error(route: Route, target: Route, session: &SessionRecord) -> anyhow::Error {
    tracing::debug!(from = %route, to = %target, "Route guard redirect");
    match target {
        Route::Login => anyhow::anyhow!("Please log in first: catalog-admin login <email>"),
        Route::Dashboard if session.is_authenticated && matches!(route, Route::Login | Route::Signup) => {
            anyhow::anyhow!("Already logged in; run `catalog-admin logout` first")
        }
        _ => anyhow::anyhow!("{} is not available for your role", route.label()),
    }
}

fn list_page<'a, T: crate::listing::Searchable>(items: &'a [T], list: &ListArgs) -> Page<&'a T> {
    let found = search(items, list.search.as_deref().unwrap_or_default());
    paginate(found, list.page, list.per_page)
}

fn print_products(page: Page<&Product>) {
    if page.items.is_empty() {
        println!("No products found");
    }
    for product in &page.items {
        println!(
            "{:>5}  {:<28} {:>20}  {:<16} {}",
            product.id,
            product.name,
            format_inr(product.price),
            product.category_name().unwrap_or("-"),
            product.tags.join(", ")
        );
    }
    print_footer(&page);
}

fn print_footer<T>(page: &Page<T>) {
    println!(
        "Page {}/{} ({} items)",
        page.page, page.total_pages, page.total_items
    );
}

fn print_user(user: &UserInfo) {
    println!("Name:  {}", user.name);
    println!("Email: {}", user.email);
    println!("Role:  {}", user.role);
}

fn prompt_password(prompt: &str) -> Result<String> {
    Password::new()
        .with_prompt(prompt)
        .interact()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

async fn load_image(path: Option<PathBuf>) -> Result<Option<ImageUpload>> {
    match path {
        Some(path) => Ok(Some(ImageUpload::from_path(&path).await?)),
        None => Ok(None),
    }
}
