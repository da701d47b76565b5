use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const REQUIRED_FIELD: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice.";

const GROUP_TITLE_MAX_CHARS: usize = 200;
const GROUP_SLUG_MAX_CHARS: usize = 100;
const USERNAME_MAX_CHARS: usize = 150;
const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];
/// First path segments owned by other routes; a profile under them would be
/// unreachable.
const RESERVED_USERNAMES: &[&str] = &["auth", "check_health", "follow", "group", "new"];

/// Field name to messages, in a stable order.
pub type FormErrors = BTreeMap<&'static str, Vec<String>>;

fn add_error(errors: &mut FormErrors, field: &'static str, message: impl Into<String>) {
    errors.entry(field).or_default().push(message.into());
}

fn required<'a>(
    errors: &mut FormErrors,
    field: &'static str,
    value: &'a Option<String>,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            add_error(errors, field, REQUIRED_FIELD);
            None
        }
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn max_chars(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) -> bool {
    let len = value.chars().count();
    if len > max {
        add_error(
            errors,
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
        return false;
    }
    true
}

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            add_error(&mut errors, "username", REQUIRED_FIELD);
        } else if max_chars(&mut errors, "username", username, USERNAME_MAX_CHARS)
            && !username
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            add_error(
                &mut errors,
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if RESERVED_USERNAMES.contains(&username) {
            add_error(&mut errors, "username", "This username is not available.");
        }
        if self.password.is_empty() {
            add_error(&mut errors, "password", REQUIRED_FIELD);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ----------------- Post Request -----------------

/// Raw new/edit post form as submitted. `group` is the id picked in the
/// group select; an empty value means no group.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct PostForm {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<String>,
}

/// A validated post form. The group id still has to be checked against the
/// store before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl PostForm {
    pub fn from_post(text: &str, group_id: Option<i64>, image: Option<&str>) -> Self {
        PostForm {
            text: Some(text.to_string()),
            group: group_id.map(|id| id.to_string()),
            image: image.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&mut errors, "text", &self.text).map(str::to_string);

        let group_id = match optional(&self.group) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    add_error(&mut errors, "group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = optional(&self.image).map(str::to_string);
        if let Some(image) = &image {
            let extension = image
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                add_error(
                    &mut errors,
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
        }

        match text {
            Some(text) if errors.is_empty() => Ok(PostInput {
                text,
                group_id,
                image,
            }),
            _ => Err(errors),
        }
    }
}

// ----------------- Comment Request -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct CommentForm {
    pub text: Option<String>,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        match required(&mut errors, "text", &self.text) {
            Some(text) => Ok(text.to_string()),
            None => Err(errors),
        }
    }
}

// ----------------- Group Request -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct GroupForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInput {
    pub title: String,
    pub description: String,
    pub slug: String,
}

impl GroupForm {
    pub fn validate(&self) -> Result<GroupInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required(&mut errors, "title", &self.title)
            .filter(|title| max_chars(&mut errors, "title", title, GROUP_TITLE_MAX_CHARS))
            .map(str::to_string);
        let description = required(&mut errors, "description", &self.description)
            .map(str::to_string);
        let slug = required(&mut errors, "slug", &self.slug)
            .filter(|slug| max_chars(&mut errors, "slug", slug, GROUP_SLUG_MAX_CHARS))
            .filter(|slug| {
                let valid = slug
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    add_error(
                        &mut errors,
                        "slug",
                        "Enter a valid \u{201c}slug\u{201d} consisting of letters, numbers, underscores or hyphens.",
                    );
                }
                valid
            })
            .map(str::to_string);

        match (title, description, slug) {
            (Some(title), Some(description), Some(slug)) if errors.is_empty() => Ok(GroupInput {
                title,
                description,
                slug,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_form(text: &str, group: &str, image: &str) -> PostForm {
        PostForm {
            text: Some(text.to_string()),
            group: Some(group.to_string()),
            image: Some(image.to_string()),
        }
    }

    #[test]
    fn post_without_group_is_valid() {
        let input = post_form("  hello  ", "", "").validate().unwrap();
        assert_eq!(
            input,
            PostInput {
                text: "hello".to_string(),
                group_id: None,
                image: None,
            }
        );
    }

    #[test]
    fn blank_post_text_is_required() {
        let errors = post_form("   ", "", "").validate().unwrap_err();
        assert_eq!(errors["text"], vec![REQUIRED_FIELD.to_string()]);

        let errors = PostForm::default().validate().unwrap_err();
        assert!(errors.contains_key("text"));
    }

    #[test]
    fn non_numeric_group_is_invalid_choice() {
        let errors = post_form("hello", "cats", "").validate().unwrap_err();
        assert_eq!(errors["group"], vec![INVALID_CHOICE.to_string()]);
        assert!(!errors.contains_key("text"));
    }

    #[test]
    fn image_needs_image_extension() {
        assert!(post_form("hello", "1", "posts/cat.GIF").validate().is_ok());
        let errors = post_form("hello", "1", "posts/cat.txt").validate().unwrap_err();
        assert!(errors.contains_key("image"));
    }

    #[test]
    fn comment_text_is_required() {
        assert_eq!(
            CommentForm {
                text: Some("nice".to_string())
            }
            .validate()
            .unwrap(),
            "nice"
        );
        assert!(CommentForm::default().validate().is_err());
    }

    #[test]
    fn group_form_checks_every_field() {
        let errors = GroupForm::default().validate().unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["description", "slug", "title"]
        );
    }

    #[test]
    fn group_slug_must_be_slug() {
        let form = GroupForm {
            title: Some("Cats".to_string()),
            description: Some("About cats".to_string()),
            slug: Some("cats and dogs".to_string()),
        };
        assert!(form.validate().unwrap_err().contains_key("slug"));

        let form = GroupForm {
            slug: Some("cats_and-dogs".to_string()),
            ..form
        };
        assert_eq!(form.validate().unwrap().slug, "cats_and-dogs");
    }

    #[test]
    fn group_title_is_limited() {
        let form = GroupForm {
            title: Some("x".repeat(201)),
            description: Some("d".to_string()),
            slug: Some("s".to_string()),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors["title"][0].starts_with("Ensure this value has at most 200"));
    }

    #[test]
    fn register_rejects_spaces_in_username() {
        let request = RegisterRequest {
            username: "bad name".to_string(),
            password: "pw".to_string(),
        };
        assert!(request.validate().unwrap_err().contains_key("username"));
    }

    #[test]
    fn register_rejects_route_names() {
        let request = RegisterRequest {
            username: "group".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(
            request.validate().unwrap_err()["username"],
            vec!["This username is not available.".to_string()]
        );
    }
}
