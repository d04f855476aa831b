use crate::error::{AppError, Result};

/// Inline message of a full name that is not capitalized word by word.
pub const FULLNAME_MESSAGE: &str = "Имя и фамилия должны начинаться с заглавной буквы";

/// Validates a full name: space-separated words, each an uppercase letter
/// followed by lowercase letters (Latin or Cyrillic).
pub fn validate_fullname(fullname: &str) -> Result<()> {
    let well_formed = !fullname.is_empty()
        && fullname.split(' ').all(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if is_name_letter(first) && first.is_uppercase() => {
                    let rest: Vec<char> = chars.collect();
                    !rest.is_empty()
                        && rest.iter().all(|c| is_name_letter(*c) && c.is_lowercase())
                }
                _ => false,
            }
        });

    if !well_formed {
        return Err(AppError::Validation(FULLNAME_MESSAGE.to_string()));
    }

    Ok(())
}

fn is_name_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'А'..='я' | 'Ё' | 'ё')
}
