/// Derives a display name from an email address.
///
/// `tembea@gmail.com` becomes `Tembea`, and `tembea.devs@gmail.com` becomes
/// `Tembea Devs`: the first and last dot-separated parts of the local part are
/// capitalised and joined with a space.
pub fn user_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default().trim();
    let parts: Vec<&str> = local.split('.').filter(|part| !part.is_empty()).collect();

    match parts.as_slice() {
        [] => String::new(),
        [only] => capitalize(only),
        [first, .., last] => format!("{} {}", capitalize(first), capitalize(last)),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::user_name_from_email;

    #[test]
    fn single_part_local_is_capitalised() {
        assert_eq!(user_name_from_email("tembea@gmail.com"), "Tembea");
    }

    #[test]
    fn dotted_local_uses_first_and_last_parts() {
        assert_eq!(user_name_from_email("tembea.devs@gmail.com"), "Tembea Devs");
        assert_eq!(user_name_from_email("john.k.doe@andela.com"), "John Doe");
    }

    #[test]
    fn empty_input_yields_empty_name() {
        assert_eq!(user_name_from_email(""), "");
    }
}
