//! Password strength rules applied at registration.

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "11111111",
    "87654321",
    "qwerty",
    "qwerty123",
    "qwertyuiop",
    "abc12345",
    "abcd1234",
    "letmein",
    "iloveyou",
    "welcome",
    "welcome1",
    "admin123",
    "administrator",
    "monkey123",
    "football",
    "baseball",
    "sunshine",
    "princess",
    "trustno1",
    "superman",
    "starwars",
    "whatever",
    "changeme",
];

/// Shortest user attribute considered when checking similarity.
const MIN_ATTRIBUTE_LEN: usize = 3;

/// Checks `password` against every rule and returns one message per failure.
#[must_use]
pub fn check_password(password: &str, username: &str, email: &str, min_length: usize) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < min_length {
        problems.push(format!(
            "This password is too short. It must contain at least {min_length} characters."
        ));
    }

    let lowered = password.to_lowercase();

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    let email_local = email.split('@').next().unwrap_or_default();
    for (attribute, label) in [(username, "username"), (email_local, "email address")] {
        if is_too_similar(&lowered, &attribute.to_lowercase()) {
            problems.push(format!("The password is too similar to the {label}."));
        }
    }

    problems
}

fn is_too_similar(password: &str, attribute: &str) -> bool {
    if attribute.chars().count() < MIN_ATTRIBUTE_LEN || password.is_empty() {
        return false;
    }
    password.contains(attribute) || attribute.contains(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(check_password("123123@sdD", "testuser", "test@testuser.com", 8).is_empty());
        assert!(check_password("you_know_nothing", "john", "john@snow.com", 8).is_empty());
    }

    #[test]
    fn short_numeric_password_fails_twice() {
        let problems = check_password("123123", "testuser", "test@testuser.com", 8);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("too short"));
        assert!(problems[1].contains("entirely numeric"));
    }

    #[test]
    fn common_password_fails_case_insensitively() {
        let problems = check_password("PassWord123", "someone", "someone@example.com", 8);
        assert_eq!(problems, ["This password is too common."]);
    }

    #[test]
    fn password_containing_username_fails() {
        let problems = check_password("testuser2024!", "testuser", "x@example.com", 8);
        assert_eq!(problems, ["The password is too similar to the username."]);
    }

    #[test]
    fn short_attributes_are_ignored() {
        assert!(check_password("ab-secret-99", "ab", "ab@example.com", 8).is_empty());
    }

    #[test]
    fn minimum_length_is_configurable() {
        assert!(check_password("x9!kq", "someone", "someone@example.com", 5).is_empty());
        assert!(!check_password("x9!kq", "someone", "someone@example.com", 6).is_empty());
    }
}
