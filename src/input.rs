//! Workbook inputs: the channel list and the email credentials.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use secrecy::SecretString;
use tracing::info;

use crate::error::InputReadError;
use crate::notify::EmailCreds;
use crate::pipeline::types::ChannelRef;

/// First-cell values treated as a column header rather than a channel.
const CHANNEL_HEADERS: [&str; 8] = [
    "channel", "channels", "url", "urls", "link", "links", "username", "usernames",
];

const SENDER_COLUMN: &str = "Sender";
const PASSWORD_COLUMN: &str = "App password";
const RECEIVER_COLUMN: &str = "Receiver";

/// Open a workbook and return its first sheet.
fn first_sheet(path: &Path) -> Result<Range<Data>, InputReadError> {
    let open_failed = |reason: String| InputReadError::Open {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| open_failed(e.to_string()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InputReadError::NoSheets {
            path: path.to_path_buf(),
        })?
        .map_err(|e| open_failed(e.to_string()))
}

/// Render a cell as trimmed text; whole floats lose their `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Normalise a header label for comparison: lowercase, single spaces.
fn header_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Channel identifiers from the first column of the first sheet.
///
/// Blank cells are dropped, and a leading header cell such as `Channel` or
/// `URL` is skipped.
pub fn read_channels(path: &Path) -> Result<Vec<ChannelRef>, InputReadError> {
    let range = first_sheet(path)?;

    let mut values: Vec<String> = match (range.start(), range.end()) {
        (Some((first, _)), Some((last, _))) => (first..=last)
            .map(|row| range.get_value((row, 0)).map(cell_text).unwrap_or_default())
            .filter(|value| !value.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    if values
        .first()
        .is_some_and(|first| CHANNEL_HEADERS.contains(&header_key(first).as_str()))
    {
        values.remove(0);
    }

    info!(path = %path.display(), count = values.len(), "Loaded channels");
    Ok(values.into_iter().map(ChannelRef::new).collect())
}

/// Email credentials from the first data row under a
/// `Sender` / `App password` / `Receiver` header.
///
/// Only the row directly below the header is read; blank cells there are
/// `EmptyValue` errors.
pub fn read_email_creds(path: &Path) -> Result<EmailCreds, InputReadError> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();

    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| header_key(&cell_text(c))).collect())
        .unwrap_or_default();

    let column = |name: &str| {
        let key = header_key(name);
        header
            .iter()
            .position(|h| *h == key)
            .ok_or_else(|| InputReadError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let sender_col = column(SENDER_COLUMN)?;
    let password_col = column(PASSWORD_COLUMN)?;
    let receiver_col = column(RECEIVER_COLUMN)?;

    let row = rows.next().ok_or_else(|| InputReadError::NoDataRow {
        path: path.to_path_buf(),
    })?;

    let value = |col: usize, name: &str| {
        let text = row.get(col).map(cell_text).unwrap_or_default();
        if text.is_empty() {
            return Err(InputReadError::EmptyValue {
                path: path.to_path_buf(),
                column: name.to_string(),
            });
        }
        Ok(text)
    };

    Ok(EmailCreds {
        sender: value(sender_col, SENDER_COLUMN)?,
        app_password: SecretString::from(value(password_col, PASSWORD_COLUMN)?),
        receiver: value(receiver_col, RECEIVER_COLUMN)?,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use secrecy::ExposeSecret;

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn reads_channels_skipping_header_and_blanks() {
        let channels = read_channels(&fixture("channels.xlsx")).unwrap();
        let names: Vec<_> = channels.iter().map(ChannelRef::as_str).collect();
        assert_eq!(
            names,
            vec!["https://t.me/durov", "@telegram", "t.me/s/rustlang", "12345"]
        );
    }

    #[test]
    fn reads_channels_without_header() {
        let channels = read_channels(&fixture("channels_no_header.xlsx")).unwrap();
        let names: Vec<_> = channels.iter().map(ChannelRef::as_str).collect();
        assert_eq!(names, vec!["https://t.me/durov", "telegram"]);
    }

    #[test]
    fn missing_channel_file_is_input_error() {
        let err = read_channels(&fixture("does_not_exist.xlsx")).unwrap_err();
        assert!(matches!(err, InputReadError::Open { .. }));
    }

    #[test]
    fn corrupt_channel_file_is_input_error() {
        let err = read_channels(&fixture("not_a_workbook.xlsx")).unwrap_err();
        assert!(matches!(err, InputReadError::Open { .. }));
    }

    #[test]
    fn reads_first_credentials_row() {
        let creds = read_email_creds(&fixture("email_credentials.xlsx")).unwrap();
        assert_eq!(creds.sender, "bot@example.com");
        assert_eq!(creds.app_password.expose_secret(), "abcd efgh ijkl mnop");
        assert_eq!(creds.receiver, "ops@example.com");
    }

    #[test]
    fn credentials_missing_column() {
        let err = read_email_creds(&fixture("email_missing_column.xlsx")).unwrap_err();
        assert!(matches!(err, InputReadError::MissingColumn { column, .. } if column == "App password"));
    }

    #[test]
    fn credentials_without_data_row() {
        let err = read_email_creds(&fixture("email_header_only.xlsx")).unwrap_err();
        assert!(matches!(err, InputReadError::NoDataRow { .. }));
    }

    #[test]
    fn credentials_blank_first_row_is_not_skipped() {
        let err = read_email_creds(&fixture("email_blank_first_row.xlsx")).unwrap_err();
        assert!(matches!(err, InputReadError::EmptyValue { column, .. } if column == "Sender"));
    }

    #[test]
    fn whole_floats_render_as_integers() {
        assert_eq!(cell_text(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::String("  @name ".into())), "@name");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn header_keys_ignore_case_and_spacing() {
        assert_eq!(header_key("  App   Password "), "app password");
        assert_eq!(header_key("Channel"), "channel");
    }
}
