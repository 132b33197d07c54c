use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A value held in a [`Collection`](super::Collection).
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name used by the persistent backend.
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

/// Defines a flat status enumeration. Any member may be written over any
/// other; there is no transition graph.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $default:ident => $default_str:literal $(, $variant:ident => $s:literal)* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            #[default]
            $default,
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$name::$default, $($name::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $name::$default => $default_str,
                    $($name::$variant => $s,)*
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $default_str => Ok($name::$default),
                    $($s => Ok($name::$variant),)*
                    other => Err(UnknownStatus(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(
    /// Review state of an admission application.
    ApplicationStatus {
        Pending => "pending",
        Reviewed => "reviewed",
        Accepted => "accepted",
        Rejected => "rejected",
    }
);

status_enum!(
    /// Handling state of a contact inquiry.
    InquiryStatus {
        New => "new",
        Read => "read",
        Responded => "responded",
        Archived => "archived",
    }
);

status_enum!(
    PostStatus {
        Draft => "draft",
        Published => "published",
    }
);

// ── Applications ─────────────────────────────────────────────────────────────

/// Validated, escaped application fields awaiting an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub grade_applying_for: String,
    pub message: Option<String>,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub grade_applying_for: String,
    pub message: Option<String>,
    pub parent_name: Option<String>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn new(id: String, fields: NewApplication, now: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: fields.full_name,
            email: fields.email,
            phone: fields.phone,
            grade_applying_for: fields.grade_applying_for,
            message: fields.message,
            parent_name: fields.parent_name,
            status: ApplicationStatus::default(),
            submitted_at: now,
            updated_at: None,
        }
    }
}

impl Record for Application {
    const TABLE: &'static str = "applications";

    fn id(&self) -> &str {
        &self.id
    }
}

// ── Contact inquiries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: InquiryStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Inquiry {
    pub fn new(id: String, fields: NewInquiry, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            subject: fields.subject,
            message: fields.message,
            status: InquiryStatus::default(),
            submitted_at: now,
            updated_at: None,
        }
    }
}

impl Record for Inquiry {
    const TABLE: &'static str = "inquiries";

    fn id(&self) -> &str {
        &self.id
    }
}

// ── Blog posts ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewBlogPost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub author: String,
    pub image: String,
    pub status: PostStatus,
}

/// Fields supplied to an update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub status: Option<PostStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    /// Fixed at creation; later title edits do not move the post's URL.
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub author: String,
    pub image: String,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn new(id: String, fields: NewBlogPost, now: DateTime<Utc>) -> Self {
        Self {
            id,
            published_at: (fields.status == PostStatus::Published).then_some(now),
            title: fields.title,
            slug: fields.slug,
            excerpt: fields.excerpt,
            content: fields.content,
            category: fields.category,
            author: fields.author,
            image: fields.image,
            status: fields.status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Overwrites the supplied fields. `published_at` is stamped the first
    /// time the post becomes published and kept thereafter.
    pub fn apply(&mut self, changes: PostChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(excerpt) = changes.excerpt {
            self.excerpt = Some(excerpt);
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(author) = changes.author {
            self.author = author;
        }
        if let Some(image) = changes.image {
            self.image = image;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if self.is_published() && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.updated_at = now;
    }
}

impl Record for BlogPost {
    const TABLE: &'static str = "blog_posts";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn draft() -> BlogPost {
        BlogPost::new(
            "10".into(),
            NewBlogPost {
                title: "Open Day".into(),
                slug: "open-day".into(),
                excerpt: None,
                content: "Come visit".into(),
                category: "Events".into(),
                author: "Admin".into(),
                image: "/images/blog/default.jpg".into(),
                status: PostStatus::Draft,
            },
            at(1),
        )
    }

    #[test]
    fn statuses_parse_only_their_own_members() {
        assert_eq!("reviewed".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Reviewed));
        assert!("read".parse::<ApplicationStatus>().is_err());
        assert_eq!("archived".parse::<InquiryStatus>(), Ok(InquiryStatus::Archived));
        assert!("Archived".parse::<InquiryStatus>().is_err());
        assert_eq!(
            "bogus".parse::<PostStatus>(),
            Err(UnknownStatus("bogus".into()))
        );
    }

    #[test]
    fn initial_statuses() {
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::Pending);
        assert_eq!(InquiryStatus::default(), InquiryStatus::New);
        assert_eq!(PostStatus::default(), PostStatus::Draft);
        assert_eq!(ApplicationStatus::ALL.len(), 4);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(InquiryStatus::Responded).unwrap();
        assert_eq!(json, "responded");
    }

    #[test]
    fn application_serializes_camel_case() {
        let app = Application::new(
            "1".into(),
            NewApplication {
                full_name: "Ada Obi".into(),
                email: "ada@example.com".into(),
                phone: "+2348031234567".into(),
                grade_applying_for: "JSS1".into(),
                message: None,
                parent_name: None,
            },
            at(1),
        );
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["fullName"], "Ada Obi");
        assert_eq!(json["gradeApplyingFor"], "JSS1");
        assert_eq!(json["status"], "pending");
        assert!(json["updatedAt"].is_null());
    }

    #[test]
    fn draft_has_no_publish_date() {
        assert_eq!(draft().published_at, None);
    }

    #[test]
    fn publishing_stamps_once() {
        let mut post = draft();
        post.apply(
            PostChanges {
                status: Some(PostStatus::Published),
                ..Default::default()
            },
            at(2),
        );
        assert_eq!(post.published_at, Some(at(2)));

        post.apply(
            PostChanges {
                status: Some(PostStatus::Draft),
                ..Default::default()
            },
            at(3),
        );
        post.apply(
            PostChanges {
                status: Some(PostStatus::Published),
                ..Default::default()
            },
            at(4),
        );
        assert_eq!(post.published_at, Some(at(2)));
        assert_eq!(post.updated_at, at(4));
    }

    #[test]
    fn apply_keeps_slug_and_untouched_fields() {
        let mut post = draft();
        post.apply(
            PostChanges {
                title: Some("Open Day Moved".into()),
                ..Default::default()
            },
            at(2),
        );
        assert_eq!(post.title, "Open Day Moved");
        assert_eq!(post.slug, "open-day");
        assert_eq!(post.content, "Come visit");
        assert_eq!(post.created_at, at(1));
    }
}
