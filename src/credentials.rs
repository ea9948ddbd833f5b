use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use log::error;
use rand::rngs::OsRng;

/// Argon2id hashing and verification of user passwords.
///
/// Hashes are PHC strings carrying their own salt and cost parameters, so a
/// hash stays verifiable after the configured parameters change.
pub struct Credentials {
    argon2: Argon2<'static>,
    // verified against when the user doesn't exist
    dummy: String,
}

impl Credentials {
    pub fn new() -> Result<Self, ()> {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Result<Self, ()> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy = hash_with(&argon2, "no-such-user")?;

        Ok(Self { argon2, dummy })
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, ()> {
        hash_with(&self.argon2, plaintext)
    }

    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("stored password hash doesn't parse: {e}");
                return false;
            }
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the same effort as a real verification, for unknown users.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy);
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String, ()> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("couldn't hash password: {e}");
        })
}

#[cfg(test)]
mod test {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::with_params(Params::new(8, 1, 1, None).unwrap()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let creds = credentials();
        let hash = creds.hash("hunter2").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(creds.verify("hunter2", &hash));
        assert!(!creds.verify("hunter3", &hash));
    }

    #[test]
    fn salted() {
        let creds = credentials();

        let a = creds.hash("pw").unwrap();
        let b = creds.hash("pw").unwrap();

        assert_ne!(a, b);
        assert!(creds.verify("pw", &a));
        assert!(creds.verify("pw", &b));
    }

    #[test]
    fn params_come_from_the_hash() {
        let cheap = credentials();
        let other = Credentials::with_params(Params::new(16, 2, 1, None).unwrap()).unwrap();

        let hash = cheap.hash("pw").unwrap();
        assert!(other.verify("pw", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        let creds = credentials();

        assert!(!creds.verify("pw", ""));
        assert!(!creds.verify("pw", "pw"));
        assert!(!creds.verify("pw", "$argon2id$garbage"));
    }
}
