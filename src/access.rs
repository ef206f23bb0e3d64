// Access policy
// Route table, route guard, role navigation and product ownership rules.

use std::fmt;

use crate::models::Product;
use crate::session::{Role, SessionRecord, UserInfo};

/// Screens of the admin client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Signup,
    ForgetPassword,
    ResetPassword,
    Dashboard,
    Products,
    SubAdminProducts,
    AllUsers,
    Categories,
    NotFound,
}

/// How a route treats the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Only for anonymous visitors
    Public,
    /// Reachable with or without a session
    Open,
    /// Requires a session, optionally a specific role
    Protected(Option<Role>),
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Root,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/forgetpassword" => Route::ForgetPassword,
            "/resetpassword" => Route::ResetPassword,
            "/dashboard" => Route::Dashboard,
            "/products" => Route::Products,
            "/subadminproducts" => Route::SubAdminProducts,
            "/allusers" => Route::AllUsers,
            "/categories" => Route::Categories,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::ForgetPassword => "/forgetpassword",
            Route::ResetPassword => "/resetpassword",
            Route::Dashboard => "/dashboard",
            Route::Products => "/products",
            Route::SubAdminProducts => "/subadminproducts",
            Route::AllUsers => "/allusers",
            Route::Categories => "/categories",
            Route::NotFound => "/404",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Root => "Home",
            Route::Login => "Login",
            Route::Signup => "Sign Up",
            Route::ForgetPassword => "Forgot Password",
            Route::ResetPassword => "Reset Password",
            Route::Dashboard => "Dashboard",
            Route::Products => "Products",
            Route::SubAdminProducts => "Sub-Admin Products",
            Route::AllUsers => "All Users",
            Route::Categories => "Categories",
            Route::NotFound => "Page Not Found",
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Route::Login | Route::Signup => Kind::Public,
            Route::Root | Route::ForgetPassword | Route::ResetPassword | Route::NotFound => Kind::Open,
            Route::Dashboard | Route::Products => Kind::Protected(None),
            Route::SubAdminProducts => Kind::Protected(Some(Role::SubAdmin)),
            Route::AllUsers | Route::Categories => Kind::Protected(Some(Role::Admin)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Decision of the route guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}

/// Decide whether `session` may open `route`
pub fn guard(route: Route, session: &SessionRecord) -> Access {
    let authenticated = session.is_authenticated;

    if route == Route::Root {
        return Access::Redirect(home(session));
    }

    match route.kind() {
        Kind::Open => Access::Allow,
        Kind::Public if authenticated => Access::Redirect(Route::Dashboard),
        Kind::Public => Access::Allow,
        Kind::Protected(_) if !authenticated => Access::Redirect(Route::Login),
        Kind::Protected(Some(required)) if session.role() != Some(required) => {
            Access::Redirect(Route::Dashboard)
        }
        Kind::Protected(_) => Access::Allow,
    }
}

/// Landing route for a session
pub fn home(session: &SessionRecord) -> Route {
    if session.is_authenticated {
        Route::Dashboard
    } else {
        Route::Login
    }
}

/// Where to go once the gateway reports an expired session
pub fn after_session_expired(current: Route) -> Option<Route> {
    if current == Route::Login {
        None
    } else {
        Some(Route::Login)
    }
}

/// Dashboard entries for a role, in display order
pub fn navigation(role: Role) -> Vec<Route> {
    let mut routes = vec![Route::Dashboard, Route::Products];
    match role {
        Role::SubAdmin => routes.push(Route::SubAdminProducts),
        Role::Admin => routes.extend([Route::AllUsers, Route::Categories]),
        Role::User => {}
    }
    routes.extend([Route::ForgetPassword, Route::ResetPassword]);
    routes
}

pub fn can_manage_categories(role: Role) -> bool {
    role == Role::Admin
}

pub fn can_manage_users(role: Role) -> bool {
    role == Role::Admin
}

/// Roles that may create products at all
pub fn can_manage_products(role: Role) -> bool {
    matches!(role, Role::Admin | Role::SubAdmin)
}

/// Admins may edit or delete any product; sub-admins only their own
pub fn can_modify_product(user: &UserInfo, product: &Product) -> bool {
    match user.role {
        Role::Admin => true,
        Role::SubAdmin => product.created_by == Some(user.id),
        Role::User => false,
    }
}

/// Products shown on the management list for `user`
pub fn visible_products<'a>(products: &'a [Product], user: &UserInfo, category: Option<&str>) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| !p.is_deleted)
        .filter(|p| user.role != Role::SubAdmin || p.created_by == Some(user.id))
        .filter(|p| category.map_or(true, |name| p.category_name() == Some(name)))
        .collect()
}
