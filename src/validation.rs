// Form validation rules for the account and catalog forms

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;
use crate::models::PRODUCT_COLORS;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

const MIN_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// One failed rule on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Collects field errors and turns them into an `ApiError`
#[derive(Debug, Default)]
struct Checks(Vec<FieldError>);

impl Checks {
    fn name(&mut self, field: &'static str, value: &str, label: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, format!("{} is required", label));
        } else if value.chars().count() < MIN_NAME_LEN {
            self.fail(field, format!("{} must be at least {} characters", label, MIN_NAME_LEN));
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, "Email is required");
        } else if !EMAIL_PATTERN.is_match(value) {
            self.fail(field, "Please enter a valid email");
        }
    }

    fn password(&mut self, field: &'static str, value: &str, label: &str) {
        if value.is_empty() {
            self.fail(field, format!("{} is required", label));
        } else if value.chars().count() < MIN_PASSWORD_LEN {
            self.fail(field, format!("{} must be at least {} characters", label, MIN_PASSWORD_LEN));
        }
    }

    fn matches(&mut self, field: &'static str, value: &str, expected: &str) {
        if value.is_empty() {
            self.fail(field, "Please confirm your password");
        } else if value != expected {
            self.fail(field, "Passwords must match");
        }
    }

    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish(self) -> Vec<FieldError> {
        self.0
    }
}

/// Fold field errors into a single validation error
pub fn into_result(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Err(ApiError::ValidationError(message))
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut checks = Checks::default();
        checks.email("email", &self.email);
        checks.password("password", &self.password, "Password");
        checks.finish()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        into_result(self.errors())
    }
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut checks = Checks::default();
        checks.name("name", &self.name, "Name");
        checks.email("email", &self.email);
        checks.password("password", &self.password, "Password");
        checks.matches("confirm_password", &self.confirm_password, &self.password);
        checks.finish()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        into_result(self.errors())
    }
}

#[derive(Debug, Clone)]
pub struct ForgotPasswordForm {
    pub email: String,
    pub password: String,
}

impl ForgotPasswordForm {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut checks = Checks::default();
        checks.email("email", &self.email);
        checks.password("password", &self.password, "Password");
        checks.finish()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        into_result(self.errors())
    }
}

#[derive(Debug, Clone)]
pub struct ResetPasswordForm {
    pub email: String,
    pub old_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl ResetPasswordForm {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut checks = Checks::default();
        checks.email("email", &self.email);
        checks.password("old_password", &self.old_password, "Old Password");
        checks.password("new_password", &self.new_password, "New Password");
        checks.matches("confirm_new_password", &self.confirm_new_password, &self.new_password);
        checks.finish()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        into_result(self.errors())
    }
}

/// Product fields as entered; `has_image` tells whether a file was chosen
#[derive(Debug, Clone)]
pub struct ProductForm<'a> {
    pub name: &'a str,
    pub price: f64,
    pub color: &'a str,
    pub category_id: Option<i64>,
    pub has_image: bool,
    pub is_edit: bool,
}

impl ProductForm<'_> {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut checks = Checks::default();
        checks.name("products_name", self.name, "Product name");
        if !self.price.is_finite() || self.price <= 0.0 {
            checks.fail("price", "Price must be greater than zero");
        }
        if self.color.trim().is_empty() {
            checks.fail("color", "Please select a color");
        } else if !PRODUCT_COLORS.iter().any(|c| c.eq_ignore_ascii_case(self.color.trim())) {
            checks.fail(
                "color",
                format!("Color must be one of: {}", PRODUCT_COLORS.join(", ")),
            );
        }
        if self.category_id.is_none() {
            checks.fail("category_id", "Category is required");
        }
        if !self.is_edit && !self.has_image {
            checks.fail("products_image", "Product image is required");
        }
        checks.finish()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        into_result(self.errors())
    }
}

/// Category create/update; both fields are mandatory
pub fn validate_category(name: &str, has_image: bool) -> Result<(), ApiError> {
    if name.trim().is_empty() || !has_image {
        return Err(ApiError::ValidationError("All fields are required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_email_pattern() {
        assert!(EMAIL_PATTERN.is_match("asha.k+admin@shop.example.in"));
        assert!(!EMAIL_PATTERN.is_match("asha@localhost"));
        assert!(!EMAIL_PATTERN.is_match("asha example.com"));
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(form.validate().is_ok());

        let form = LoginForm {
            email: String::new(),
            password: "123".to_string(),
        };
        assert_eq!(fields(&form.errors()), vec!["email", "password"]);
    }

    #[test]
    fn test_signup_passwords_must_match() {
        let form = SignupForm {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret2".to_string(),
        };
        let errors = form.errors();
        assert_eq!(fields(&errors), vec!["confirm_password"]);
        assert_eq!(errors[0].message, "Passwords must match");
    }

    #[test]
    fn test_signup_short_name() {
        let form = SignupForm {
            name: "Al".to_string(),
            email: "al@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Name must be at least 3 characters");
    }

    #[test]
    fn test_reset_password_form() {
        let form = ResetPasswordForm {
            email: "asha@example.com".to_string(),
            old_password: "secret1".to_string(),
            new_password: "new".to_string(),
            confirm_new_password: "other".to_string(),
        };
        assert_eq!(fields(&form.errors()), vec!["new_password", "confirm_new_password"]);
    }

    #[test]
    fn test_product_form() {
        let form = ProductForm {
            name: "Desk Lamp",
            price: 1499.0,
            color: "black",
            category_id: Some(2),
            has_image: true,
            is_edit: false,
        };
        assert!(form.validate().is_ok());

        let form = ProductForm {
            name: "La",
            price: 0.0,
            color: "Purple",
            category_id: None,
            has_image: false,
            is_edit: false,
        };
        assert_eq!(
            fields(&form.errors()),
            vec!["products_name", "price", "color", "category_id", "products_image"]
        );
    }

    #[test]
    fn test_product_image_optional_on_edit() {
        let form = ProductForm {
            name: "Desk Lamp",
            price: 10.0,
            color: "Red",
            category_id: Some(1),
            has_image: false,
            is_edit: true,
        };
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_category_requires_all_fields() {
        assert!(validate_category("Lighting", true).is_ok());
        assert!(validate_category("  ", true).is_err());
        assert!(validate_category("Lighting", false).is_err());
    }
}
