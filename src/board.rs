//! Message board operations over any site backend

use crate::backend::SiteBackend;
use crate::collection::Collection;
use crate::model::{Message, Record};
use crate::Result;

/// Post a new message, returning its id.
///
/// Blank content is rejected before anything is written.
pub async fn post_message<B>(backend: &B, name: &str, content: &str) -> Result<String>
where
    B: SiteBackend + ?Sized,
{
    let message = Message::new(name, content)?;
    let id = backend.save(Collection::Messages, message.to_fields(), None).await?;
    tracing::info!(id = %id, "Posted message");
    Ok(id)
}

/// Add one like to a message, returning the new count
pub async fn like_message<B>(backend: &B, id: &str) -> Result<u64>
where
    B: SiteBackend + ?Sized,
{
    let likes = backend.like(id).await?;
    tracing::info!(id = %id, likes, "Liked message");
    Ok(likes)
}
