use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::{LoginRequest, RegisterRequest};
use crate::error::FieldErrors;
use crate::items::dto::{CreateItemRequest, UpdateItemRequest};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalized registration input. Construction only via `validate_register`.
#[derive(Debug)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

struct Errors(FieldErrors);

impl Errors {
    fn new() -> Self {
        Self(FieldErrors::new())
    }
    fn push(&mut self, field: &str, message: &str) {
        self.0.entry(field.to_string()).or_default().push(message.to_string());
    }
    fn finish(self) -> Result<(), FieldErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

fn check_password_strength(errors: &mut Errors, password: &str) {
    if password.len() < 8 {
        errors.push("password", "password must be at least 8 characters");
        return;
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("password", "password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("password", "password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("password", "password must contain at least one digit");
    }
}

pub fn validate_register(req: RegisterRequest) -> Result<RegisterInput, FieldErrors> {
    let mut errors = Errors::new();

    let username = req.username.trim().to_string();
    if username.is_empty() {
        errors.push("username", "username is required");
    } else if username.chars().count() > 30 {
        errors.push("username", "username must be at most 30 characters");
    }

    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        errors.push("email", "must be a valid email address");
    }

    check_password_strength(&mut errors, &req.password);

    errors.finish()?;
    Ok(RegisterInput {
        username,
        email,
        password: req.password,
    })
}

pub fn validate_login(req: LoginRequest) -> Result<LoginInput, FieldErrors> {
    let mut errors = Errors::new();

    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        errors.push("email", "must be a valid email address");
    }
    if req.password.is_empty() {
        errors.push("password", "password is required");
    }

    errors.finish()?;
    Ok(LoginInput {
        email,
        password: req.password,
    })
}

pub fn validate_create_item(req: &CreateItemRequest) -> Result<(), FieldErrors> {
    let mut errors = Errors::new();

    let name_len = req.name.trim().chars().count();
    if name_len == 0 || name_len > 50 {
        errors.push("name", "name must be between 1 and 50 characters");
    }
    if req.quantity < 1 {
        errors.push("quantity", "quantity must be at least 1");
    }
    if let Some(description) = &req.description {
        if description.chars().count() > 255 {
            errors.push("description", "description must be at most 255 characters");
        }
    }
    if let Some(location) = &req.location {
        if location.chars().count() > 120 {
            errors.push("location", "location must be at most 120 characters");
        }
    }
    if let Some(unit) = &req.unit {
        if unit.chars().count() > 10 {
            errors.push("unit", "unit must be at most 10 characters");
        }
    }

    errors.finish()
}

pub fn validate_update_item(req: &UpdateItemRequest) -> Result<(), FieldErrors> {
    let mut errors = Errors::new();

    if let Some(name) = &req.name {
        let len = name.trim().chars().count();
        if len == 0 || len > 50 {
            errors.push("name", "name must be between 1 and 50 characters");
        }
    }
    if let Some(quantity) = req.quantity {
        if quantity < 1 {
            errors.push("quantity", "quantity must be at least 1");
        }
    }
    if let Some(description) = &req.description {
        if description.chars().count() > 255 {
            errors.push("description", "description must be at most 255 characters");
        }
    }
    if let Some(location) = &req.location {
        if location.chars().count() > 120 {
            errors.push("location", "location must be at most 120 characters");
        }
    }
    if let Some(unit) = &req.unit {
        if unit.chars().count() > 10 {
            errors.push("unit", "unit must be at most 10 characters");
        }
    }

    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        let input = validate_register(register("alice", "a@x.com", "Password123")).unwrap();
        assert_eq!(input.username, "alice");
        assert_eq!(input.email, "a@x.com");
    }

    #[test]
    fn rejects_empty_username() {
        let errors = validate_register(register("", "a@x.com", "Password123")).unwrap_err();
        assert!(errors.contains_key("username"));
    }

    #[test]
    fn rejects_overlong_username() {
        let errors =
            validate_register(register(&"x".repeat(31), "a@x.com", "Password123")).unwrap_err();
        assert!(errors.contains_key("username"));
    }

    #[test]
    fn rejects_bad_email() {
        let errors = validate_register(register("a", "invalid-email", "Password123")).unwrap_err();
        assert!(errors.contains_key("email"));
    }

    #[test]
    fn rejects_weak_passwords() {
        for bad in ["short", "password123", "PASSWORD123", "PasswordAbc"] {
            let errors = validate_register(register("a", "a@x.com", bad)).unwrap_err();
            assert!(errors.contains_key("password"), "expected rejection for {bad:?}");
        }
    }

    #[test]
    fn collects_errors_for_every_field() {
        let errors = validate_register(register("", "nope", "short")).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn login_requires_email_and_password() {
        let errors = validate_login(LoginRequest {
            email: "not-an-email".into(),
            password: String::new(),
        })
        .unwrap_err();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn item_bounds() {
        let mut req = CreateItemRequest {
            name: "apples".into(),
            description: None,
            quantity: 3,
            unit: None,
            expiration_date: None,
            location: None,
            latitude: None,
            longitude: None,
        };
        assert!(validate_create_item(&req).is_ok());

        req.quantity = 0;
        req.name = String::new();
        let errors = validate_create_item(&req).unwrap_err();
        assert!(errors.contains_key("quantity"));
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        let req = UpdateItemRequest {
            name: None,
            description: None,
            quantity: None,
            unit: None,
            expiration_date: None,
            location: None,
            latitude: None,
            longitude: None,
            is_available: Some(false),
        };
        assert!(validate_update_item(&req).is_ok());
    }
}
