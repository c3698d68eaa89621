use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::password::validate_password;
use crate::body::Payload;
use crate::error::AppError;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn from_payload(payload: &Payload) -> Result<Self, AppError> {
        let email = payload.trimmed("email").to_lowercase();
        let password = payload.field("password").unwrap_or_default().to_string();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Tutti i campi sono obbligatori".into(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Email non valida".into()));
        }
        Ok(Self { email, password })
    }
}

#[derive(Debug)]
pub struct RegisterForm {
    pub nome: String,
    pub cognome: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn from_payload(payload: &Payload) -> Result<Self, AppError> {
        let nome = payload.trimmed("nome");
        let cognome = payload.trimmed("cognome");
        let email = payload.trimmed("email").to_lowercase();
        let password = payload.field("password").unwrap_or_default().to_string();
        let password_confirm = payload
            .field("password_confirm")
            .unwrap_or_default()
            .to_string();

        if nome.is_empty() || cognome.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Tutti i campi sono obbligatori".into(),
            ));
        }
        if nome.chars().count() < 2 || cognome.chars().count() < 2 {
            return Err(AppError::Validation(
                "Nome e cognome devono contenere almeno 2 caratteri".into(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Email non valida".into()));
        }
        validate_password(&password).map_err(AppError::Validation)?;
        if password != password_confirm {
            return Err(AppError::Validation("Le password non corrispondono".into()));
        }

        Ok(Self {
            nome,
            cognome,
            email,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Payload::Fields(map)
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("mario.rossi@test.it"));
        assert!(!is_valid_email("mario@"));
        assert!(!is_valid_email("niente"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn login_form_normalizes_email() {
        let form = LoginForm::from_payload(&payload(&[
            ("email", "  Mario@Test.IT "),
            ("password", "x"),
        ]))
        .unwrap();
        assert_eq!(form.email, "mario@test.it");
    }

    #[test]
    fn login_form_requires_both_fields() {
        let err = LoginForm::from_payload(&payload(&[("email", "a@b.it")])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn register_form_full_validation() {
        let ok = RegisterForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
            ("password", "Student123"),
            ("password_confirm", "Student123"),
        ]));
        assert!(ok.is_ok());

        let short_name = RegisterForm::from_payload(&payload(&[
            ("nome", "M"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
            ("password", "Student123"),
            ("password_confirm", "Student123"),
        ]));
        assert!(short_name.is_err());

        let mismatch = RegisterForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
            ("password", "Student123"),
            ("password_confirm", "Student124"),
        ]));
        assert!(matches!(mismatch.unwrap_err(), AppError::Validation(msg) if msg.contains("corrispondono")));
    }
}
