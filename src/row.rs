//! Fixed-width row layout.
//!
//! A row is packed as `id` (little-endian `i32`), then `username` and
//! `email`, each left-justified and zero-padded to its column width. There
//! are no length prefixes or delimiters, so every row occupies exactly
//! [`ROW_SIZE`] bytes.

use std::fmt;

use thiserror::Error;

use crate::{
    EMAIL_OFFSET, EMAIL_SIZE, ID_OFFSET, ID_SIZE, ROW_SIZE, USERNAME_OFFSET, USERNAME_SIZE,
};

pub type RowResult<T> = Result<T, RowError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("{field} is {actual} bytes, column holds at most {max}")]
    FieldTooLarge {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} contains a NUL byte")]
    EmbeddedNul { field: &'static str },

    #[error("{field} column does not hold valid UTF-8")]
    InvalidUtf8 { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: i32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Checks both string columns against their widths. NUL bytes are
    /// rejected too, since they are indistinguishable from padding.
    pub fn validate(&self) -> RowResult<()> {
        check_field("username", &self.username, USERNAME_SIZE)?;
        check_field("email", &self.email, EMAIL_SIZE)?;
        Ok(())
    }

    pub fn serialize(&self) -> RowResult<[u8; ROW_SIZE]> {
        let mut buf = [0u8; ROW_SIZE];
        self.serialize_into(&mut buf)?;
        Ok(buf)
    }

    /// Writes the row into `dst`.
    ///
    /// Validation happens before the first byte is touched, so a rejected
    /// field leaves `dst` exactly as it was.
    pub fn serialize_into(&self, dst: &mut [u8; ROW_SIZE]) -> RowResult<()> {
        self.validate()?;

        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_padded(
            &mut dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
            &self.username,
        );
        write_padded(
            &mut dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE],
            &self.email,
        );
        Ok(())
    }

    pub fn deserialize(src: &[u8; ROW_SIZE]) -> RowResult<Self> {
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);

        Ok(Self {
            id: i32::from_le_bytes(id),
            username: read_padded(
                "username",
                &src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
            )?,
            email: read_padded("email", &src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE])?,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> RowResult<()> {
    if value.len() > max {
        return Err(RowError::FieldTooLarge {
            field,
            max,
            actual: value.len(),
        });
    }
    if value.contains('\0') {
        return Err(RowError::EmbeddedNul { field });
    }
    Ok(())
}

fn write_padded(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    dst[..bytes.len()].copy_from_slice(bytes);
    dst[bytes.len()..].fill(0);
}

fn read_padded(field: &'static str, src: &[u8]) -> RowResult<String> {
    let end = src.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(src[..end].to_vec()).map_err(|_| RowError::InvalidUtf8 { field })
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn it_round_trips_a_row() {
        let row = Row::new(42, "ann", "a@b.com");
        let bytes = row.serialize().unwrap();
        assert_eq!(Row::deserialize(&bytes).unwrap(), row);
    }

    #[test]
    fn it_round_trips_negative_ids_and_empty_strings() {
        let row = Row::new(i32::MIN, "", "");
        let bytes = row.serialize().unwrap();
        assert_eq!(Row::deserialize(&bytes).unwrap(), row);
    }

    #[test]
    fn it_packs_fields_at_fixed_offsets() {
        let bytes = Row::new(1, "ab", "c").serialize().unwrap();

        assert_eq!(ROW_SIZE, 291);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..6], b"ab");
        assert!(bytes[6..36].iter().all(|b| *b == 0));
        assert_eq!(bytes[36], b'c');
        assert!(bytes[37..].iter().all(|b| *b == 0));
    }

    #[test]
    fn it_accepts_strings_that_are_the_maximum_length() {
        let row = Row::new(7, "u".repeat(USERNAME_SIZE), "e".repeat(EMAIL_SIZE));
        let bytes = row.serialize().unwrap();
        assert_eq!(Row::deserialize(&bytes).unwrap(), row);
    }

    #[test]
    fn it_rejects_oversized_fields_without_writing() {
        let mut buf = [0xAAu8; ROW_SIZE];

        let err = Row::new(1, "u".repeat(USERNAME_SIZE + 1), "e")
            .serialize_into(&mut buf)
            .unwrap_err();
        assert_eq!(
            err,
            RowError::FieldTooLarge {
                field: "username",
                max: USERNAME_SIZE,
                actual: USERNAME_SIZE + 1,
            }
        );

        let err = Row::new(1, "u", "e".repeat(EMAIL_SIZE + 1))
            .serialize_into(&mut buf)
            .unwrap_err();
        assert_eq!(
            err,
            RowError::FieldTooLarge {
                field: "email",
                max: EMAIL_SIZE,
                actual: EMAIL_SIZE + 1,
            }
        );

        assert!(buf.iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn it_rejects_nul_bytes_without_writing() {
        let mut buf = [0xAAu8; ROW_SIZE];

        let err = Row::new(1, "a\0", "b")
            .serialize_into(&mut buf)
            .unwrap_err();
        assert_eq!(err, RowError::EmbeddedNul { field: "username" });

        let err = Row::new(1, "a", "\0b")
            .serialize_into(&mut buf)
            .unwrap_err();
        assert_eq!(err, RowError::EmbeddedNul { field: "email" });

        assert!(buf.iter().all(|b| *b == 0xAA));
    }

    fn random_field(rng: &mut impl Rng, max: usize) -> String {
        const ALPHABET: [char; 8] = ['a', 'z', '0', ' ', '.', '/', '~', '€'];

        let mut value = String::new();
        let len = rng.gen_range(0..=max);
        loop {
            let c = ALPHABET[rng.gen_range(0..ALPHABET.len())];
            if value.len() + c.len_utf8() > len {
                return value;
            }
            value.push(c);
        }
    }

    #[test]
    fn it_round_trips_random_rows() {
        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let row = Row::new(
                rng.gen_range(i32::MIN..=i32::MAX),
                random_field(&mut rng, USERNAME_SIZE),
                random_field(&mut rng, EMAIL_SIZE),
            );
            let bytes = row.serialize().unwrap();
            assert_eq!(Row::deserialize(&bytes).unwrap(), row);
        }
    }

    #[test]
    fn it_measures_width_in_bytes_not_chars() {
        // 11 three-byte characters: 11 chars, 33 bytes.
        let row = Row::new(1, "€".repeat(11), "e");
        assert!(matches!(
            row.serialize(),
            Err(RowError::FieldTooLarge { actual: 33, .. })
        ));
    }

    #[test]
    fn it_reports_invalid_utf8() {
        let mut bytes = Row::new(1, "x", "y").serialize().unwrap();
        bytes[USERNAME_OFFSET] = 0xFF;
        assert_eq!(
            Row::deserialize(&bytes).unwrap_err(),
            RowError::InvalidUtf8 { field: "username" }
        );
    }

    #[test]
    fn it_displays_as_a_tuple() {
        assert_eq!(
            Row::new(1, "user1", "person1@example.com").to_string(),
            "(1, user1, person1@example.com)"
        );
    }
}
