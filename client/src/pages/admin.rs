//! Admin article authoring: form validation ahead of `POST /articles`.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use crate::net::types::{ArticleStatus, CreateArticle};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_EXCERPT_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArticleField {
    Title,
    Excerpt,
    Content,
    Category,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ArticleFieldError {
    pub field: ArticleField,
    pub message: &'static str,
}

/// Raw values as typed into the create-article form.
#[derive(Clone, Debug, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category_id: i64,
    pub status: ArticleStatus,
    pub tags: String,
}

/// Split a comma-separated tag list, trimming and dropping empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_owned).collect()
}

/// Validate a draft into the request body.
///
/// # Errors
///
/// The first failing field, in form order.
pub fn validate_article_form(draft: &ArticleDraft) -> Result<CreateArticle, ArticleFieldError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ArticleFieldError { field: ArticleField::Title, message: "Title cannot be empty" });
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ArticleFieldError { field: ArticleField::Title, message: "Title is too long" });
    }

    let excerpt = draft.excerpt.trim();
    if excerpt.chars().count() > MAX_EXCERPT_CHARS {
        return Err(ArticleFieldError { field: ArticleField::Excerpt, message: "Excerpt is too long" });
    }

    if draft.content.trim().is_empty() {
        return Err(ArticleFieldError { field: ArticleField::Content, message: "Content cannot be empty" });
    }
    if draft.category_id < 1 {
        return Err(ArticleFieldError { field: ArticleField::Category, message: "Choose a category" });
    }

    Ok(CreateArticle {
        title: title.to_owned(),
        content: draft.content.clone(),
        excerpt: (!excerpt.is_empty()).then(|| excerpt.to_owned()),
        category_id: draft.category_id,
        status: draft.status,
        tags: parse_tags(&draft.tags),
    })
}
