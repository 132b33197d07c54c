//! Field-level checks for public submissions and blog authoring.
//!
//! Every `validate_*` function either returns a fully normalized value ready
//! for storage or the complete, ordered list of violations. Nothing is ever
//! partially accepted.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::store::model::{
    NewApplication, NewBlogPost, NewInquiry, PostChanges, PostStatus,
};

pub const DEFAULT_CATEGORY: &str = "Announcements";
pub const DEFAULT_AUTHOR: &str = "Admin";
pub const DEFAULT_IMAGE: &str = "/images/blog/default.jpg";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern compiles")
});

// Digits only once separators are stripped; optional leading '+'.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern compiles"));

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub grade_applying_for: Option<String>,
    pub message: Option<String>,
    pub parent_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InquiryInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// Body of both `POST /api/blog` and `PUT /api/blog/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct BlogPostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
}

// ── Validators ───────────────────────────────────────────────────────────────

pub fn validate_application(input: ApplicationInput) -> Result<NewApplication, Vec<String>> {
    let mut errors = Vec::new();

    let full_name = trimmed(&input.full_name);
    if full_name.chars().count() < 3 {
        errors.push("Full name must be at least 3 characters".to_string());
    }

    let email = trimmed(&input.email);
    if !is_email(email) {
        errors.push("Valid email is required".to_string());
    }

    let phone = trimmed(&input.phone);
    if !is_mobile_phone(phone) {
        errors.push("Valid phone number is required".to_string());
    }

    let grade = trimmed(&input.grade_applying_for);
    if grade.is_empty() {
        errors.push("Grade applying for is required".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewApplication {
        full_name: escape(full_name),
        email: normalize_email(email),
        phone: phone.to_string(),
        grade_applying_for: escape(grade),
        message: optional_escaped(&input.message),
        parent_name: optional_escaped(&input.parent_name),
    })
}

pub fn validate_inquiry(input: InquiryInput) -> Result<NewInquiry, Vec<String>> {
    let mut errors = Vec::new();

    let name = trimmed(&input.name);
    if name.chars().count() < 2 {
        errors.push("Name must be at least 2 characters".to_string());
    }

    let email = trimmed(&input.email);
    if !is_email(email) {
        errors.push("Valid email is required".to_string());
    }

    let phone = trimmed(&input.phone);
    if !phone.is_empty() && !is_mobile_phone(phone) {
        errors.push("Valid phone number format required".to_string());
    }

    let subject = trimmed(&input.subject);
    if subject.chars().count() < 3 {
        errors.push("Subject must be at least 3 characters".to_string());
    }

    let message = trimmed(&input.message);
    if message.chars().count() < 10 {
        errors.push("Message must be at least 10 characters".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewInquiry {
        name: escape(name),
        email: normalize_email(email),
        phone: (!phone.is_empty()).then(|| phone.to_string()),
        subject: escape(subject),
        message: escape(message),
    })
}

pub fn validate_new_post(input: BlogPostInput) -> Result<NewBlogPost, Vec<String>> {
    let mut errors = Vec::new();

    let title = trimmed(&input.title);
    if title.is_empty() {
        errors.push("Title is required".to_string());
    } else if slugify(title).is_empty() {
        errors.push("Title must contain at least one letter or number".to_string());
    }

    let content = trimmed(&input.content);
    if content.is_empty() {
        errors.push("Content is required".to_string());
    }

    let status = match parse_post_status(&input.status) {
        Ok(s) => s.unwrap_or_default(),
        Err(e) => {
            errors.push(e);
            PostStatus::default()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewBlogPost {
        slug: slugify(title),
        title: escape(title),
        content: content.to_string(),
        excerpt: optional_escaped(&input.excerpt),
        category: non_empty(&input.category).unwrap_or_else(|| DEFAULT_CATEGORY.into()),
        author: non_empty(&input.author).unwrap_or_else(|| DEFAULT_AUTHOR.into()),
        image: non_empty(&input.image).unwrap_or_else(|| DEFAULT_IMAGE.into()),
        status,
    })
}

/// Blank fields in an update mean "leave unchanged".
pub fn validate_post_changes(input: BlogPostInput) -> Result<PostChanges, Vec<String>> {
    let status = parse_post_status(&input.status).map_err(|e| vec![e])?;

    Ok(PostChanges {
        title: optional_escaped(&input.title),
        content: non_empty(&input.content),
        excerpt: optional_escaped(&input.excerpt),
        category: non_empty(&input.category),
        author: non_empty(&input.author),
        image: non_empty(&input.image),
        status,
    })
}

fn parse_post_status(raw: &Option<String>) -> Result<Option<PostStatus>, String> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| "Status must be draft or published".to_string()),
    }
}

// ── Normalization helpers ────────────────────────────────────────────────────

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    let v = trimmed(value);
    (!v.is_empty()).then(|| v.to_string())
}

fn optional_escaped(value: &Option<String>) -> Option<String> {
    non_empty(value).map(|v| escape(&v))
}

/// Replaces the characters that can open markup or break out of attributes
/// with their HTML entities.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn is_email(candidate: &str) -> bool {
    if candidate.len() > 254 || !EMAIL_RE.is_match(candidate) {
        return false;
    }
    let Some((local, domain)) = candidate.rsplit_once('@') else {
        return false;
    };
    if local.len() > 64 || local.starts_with('.') || local.ends_with('.') || local.contains("..")
    {
        return false;
    }
    // Top-level domain must be alphabetic.
    domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
}

pub fn is_mobile_phone(candidate: &str) -> bool {
    let compact: String = candidate
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    PHONE_RE.is_match(&compact)
}

/// Canonical form of an address that already passed [`is_email`]: lowercased,
/// with provider-specific sub-addressing removed.
pub fn normalize_email(email: &str) -> String {
    let lower = email.trim().to_lowercase();
    let Some((local, domain)) = lower.rsplit_once('@') else {
        return lower;
    };

    match domain {
        "gmail.com" | "googlemail.com" => {
            let base = local.split('+').next().unwrap_or(local).replace('.', "");
            format!("{base}@gmail.com")
        }
        "outlook.com" | "hotmail.com" | "live.com" | "icloud.com" | "me.com" => {
            let base = local.split('+').next().unwrap_or(local);
            format!("{base}@{domain}")
        }
        "yahoo.com" => {
            let base = local.split('-').next().unwrap_or(local);
            format!("{base}@{domain}")
        }
        _ => lower.clone(),
    }
}

/// Derives a URL slug: lowercase, keep word characters, whitespace and
/// hyphens, then join whitespace runs with a single hyphen.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}
