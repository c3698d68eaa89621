use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Password policy carried over from the registration form: at least 8
/// characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("La password deve contenere almeno 8 caratteri".into());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("La password deve contenere almeno una lettera maiuscola".into());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("La password deve contenere almeno una lettera minuscola".into());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("La password deve contenere almeno un numero".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("Corretta123").expect("hashing should succeed");
        assert!(!verify_password("Sbagliata123", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Abcdef12").is_ok());
        assert!(validate_password("corto1A").is_err());
        assert!(validate_password("tuttominuscolo1").is_err());
        assert!(validate_password("TUTTOMAIUSCOLO1").is_err());
        assert!(validate_password("SenzaNumeri").is_err());
    }
}
