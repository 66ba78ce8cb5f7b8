use respsync_core::{AppError, AppResult};

use super::{RoleAssignmentKey, RoleAssignmentRecord, TemporalValue};

/// Separator between fields of the delimited record format.
pub const FIELD_DELIMITER: &str = "||";

const NULL_LITERAL: &str = "null";

impl RoleAssignmentRecord {
    /// Parses the delimited wire form.
    ///
    /// Field layouts by count:
    /// - 3: `role||app||group` (starts at server time, open ended)
    /// - 4: `role||app||group||start`
    /// - 5: `role||app||group||start||end`
    /// - 6: `role||app||group||description||start||end`
    pub fn parse(raw: &str) -> AppResult<Self> {
        let fields = raw.split(FIELD_DELIMITER).collect::<Vec<_>>();
        if fields.len() < 3 {
            return Err(AppError::MalformedRecord(format!(
                "'{raw}' has {} field(s); role, application and security group are required",
                fields.len()
            )));
        }

        let key = RoleAssignmentKey::new(fields[0], fields[1], fields[2])
            .map_err(|error| AppError::MalformedRecord(format!("'{raw}': {error}")))?;
        let date = |value: &str| {
            TemporalValue::parse(value)
                .map_err(|error| AppError::MalformedRecord(format!("'{raw}': {error}")))
        };

        let (description, start_date, end_date) = match fields.as_slice() {
            [_, _, _] => (None, TemporalValue::ServerNow, TemporalValue::Null),
            [_, _, _, start] => (None, date(*start)?, TemporalValue::Null),
            [_, _, _, start, end] => (None, date(*start)?, date(*end)?),
            [_, _, _, description, start, end] => {
                (parse_description(description), date(*start)?, date(*end)?)
            }
            _ => {
                return Err(AppError::MalformedRecord(format!(
                    "'{raw}' has {} fields; at most 6 are allowed",
                    fields.len()
                )));
            }
        };

        Ok(Self::new(key, description, start_date, end_date))
    }

    /// Renders the delimited wire form.
    ///
    /// The description field is emitted only when the store exposes one.
    #[must_use]
    pub fn to_wire(&self, include_description: bool) -> String {
        let mut fields = vec![
            self.key.role_name().to_owned(),
            self.key.application_name().to_owned(),
            self.key.security_group_name().to_owned(),
        ];
        if include_description {
            fields.push(self.description().unwrap_or(NULL_LITERAL).to_owned());
        }
        fields.push(self.start_date.to_literal());
        fields.push(self.end_date.to_literal());

        fields.join(FIELD_DELIMITER)
    }
}

fn parse_description(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NULL_LITERAL) {
        return None;
    }

    Some(value.to_owned())
}
