use time::Date;

use crate::auth::dto::is_valid_email;
use crate::body::Payload;
use crate::dates::parse_date;
use crate::error::AppError;

/// Profile edit submission. Values are stored verbatim; HTML sanitization
/// happens where strings enter a render context.
#[derive(Debug)]
pub struct ProfileForm {
    pub nome: String,
    pub cognome: String,
    pub email: String,
    pub telefono: Option<String>,
    pub data_nascita: Date,
    pub citta: Option<String>,
    pub indirizzo: Option<String>,
    pub nazionalita: Option<String>,
    pub linkedin_url: Option<String>,
}

impl ProfileForm {
    pub fn from_payload(payload: &Payload) -> Result<Self, AppError> {
        let nome = payload.trimmed("nome");
        let cognome = payload.trimmed("cognome");
        let email = payload.trimmed("email").to_lowercase();
        let data_nascita = payload.trimmed("data_nascita");

        if nome.is_empty() || cognome.is_empty() || email.is_empty() || data_nascita.is_empty() {
            return Err(AppError::Validation(
                "Nome, cognome, email e data di nascita sono obbligatori".into(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Email non valida".into()));
        }
        let data_nascita = parse_date(&data_nascita)?;

        Ok(Self {
            nome,
            cognome,
            email,
            telefono: optional(payload, "telefono"),
            data_nascita,
            citta: optional(payload, "citta"),
            indirizzo: optional(payload, "indirizzo"),
            nazionalita: optional(payload, "nazionalita"),
            linkedin_url: optional(payload, "linkedin_url"),
        })
    }
}

fn optional(payload: &Payload, name: &str) -> Option<String> {
    let value = payload.trimmed(name);
    if value.is_empty() {
        None
    } else {
        Some(value)
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
    fn requires_the_mandatory_fields() {
        let err = ProfileForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("obbligatori")));
    }

    #[test]
    fn parses_a_full_submission() {
        let form = ProfileForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "MARIO@test.it"),
            ("data_nascita", "2001-06-15"),
            ("telefono", "+39 333 1234567"),
            ("citta", "Milano"),
        ]))
        .unwrap();
        assert_eq!(form.email, "mario@test.it");
        assert_eq!(form.citta.as_deref(), Some("Milano"));
        assert!(form.indirizzo.is_none());
        assert_eq!(format!("{}", form.data_nascita), "2001-06-15");
    }

    #[test]
    fn empty_optionals_become_none() {
        let form = ProfileForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
            ("data_nascita", "2001-06-15"),
            ("telefono", "   "),
        ]))
        .unwrap();
        assert!(form.telefono.is_none());
    }

    #[test]
    fn bad_birth_date_is_rejected() {
        let err = ProfileForm::from_payload(&payload(&[
            ("nome", "Mario"),
            ("cognome", "Rossi"),
            ("email", "mario@test.it"),
            ("data_nascita", "15/06/2001"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
