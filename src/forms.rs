use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    error::{AppError, Result},
    models::{Comment, PostRecord, User},
};

/// Runs `validator` on a submitted form and turns failures into a redisplayable 422.
pub fn validate_form<F: Validate + Serialize>(form: &F) -> Result<()> {
    form.validate()
        .map_err(|errors| AppError::invalid_form(form, &errors))
}

/// PostForm
///
/// Create/edit form for posts. Every field has a default so a missing input is reported
/// as a field error rather than a malformed request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, PartialEq)]
pub struct PostForm {
    #[serde(default)]
    #[validate(
        length(max = 256, message = "Title must be at most 256 characters."),
        custom(function = "not_blank")
    )]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,

    /// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339.
    #[serde(default)]
    #[validate(custom(function = "valid_pub_date"))]
    pub pub_date: String,

    /// Submitted as text so a malformed id comes back as a field error on redisplay.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub location_id: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub category_id: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(max = 512, message = "Image key is too long."))]
    pub image: Option<String>,

    /// Checkbox semantics: browsers omit unchecked boxes, so absence means `false`.
    #[serde(default, deserialize_with = "checkbox")]
    pub is_published: bool,
}

impl PostForm {
    /// The blank create form.
    pub fn blank(now: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            pub_date: now.format("%Y-%m-%dT%H:%M").to_string(),
            location_id: None,
            category_id: None,
            image: None,
            is_published: true,
        }
    }

    /// The edit form, prefilled from the stored post.
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.to_rfc3339(),
            location_id: post.location_id.map(|id| id.to_string()),
            category_id: post.category_id.map(|id| id.to_string()),
            image: post.image.clone(),
            is_published: post.is_published,
        }
    }

    /// The parsed publication time. Only meaningful after validation succeeded.
    pub fn pub_date_value(&self) -> Result<DateTime<Utc>> {
        parse_pub_date(&self.pub_date)
            .ok_or_else(|| AppError::field_error(self, "pub_date", PUB_DATE_MESSAGE))
    }
}

/// CommentForm
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, PartialEq)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl From<&Comment> for CommentForm {
    fn from(comment: &Comment) -> Self {
        Self {
            text: comment.text.clone(),
        }
    }
}

/// ProfileForm
///
/// The only user fields editable from the site; the username and credentials belong to the
/// identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, PartialEq)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters."))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters."))]
    pub last_name: String,

    #[serde(default)]
    #[validate(custom(function = "optional_email"))]
    pub email: String,
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

// --- Field parsers and validators ---

const PUB_DATE_MESSAGE: &str = "Enter a valid date and time.";

/// Accepts the formats HTML date and datetime-local inputs produce, plus RFC 3339.
/// Bare dates and naive times are read as UTC.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required").with_message("This field is required.".into()))
    } else {
        Ok(())
    }
}

fn valid_pub_date(value: &str) -> std::result::Result<(), ValidationError> {
    match parse_pub_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("invalid_date").with_message(PUB_DATE_MESSAGE.into())),
    }
}

fn optional_email(value: &str) -> std::result::Result<(), ValidationError> {
    use validator::ValidateEmail;

    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Enter a valid email address.".into()))
    }
}

/// HTML forms send empty strings for untouched optional inputs.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

fn checkbox<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(raw.as_str(), "on" | "true" | "1" | "yes"))
}
