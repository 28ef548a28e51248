use crate::content::GeneratedContent;
use crate::user::User;

/// Folds a successful generation into the user: bumps the matching usage
/// counter and prepends the content to the history. Anonymous sessions
/// (`None`) come back unchanged.
pub fn record(user: Option<User>, content: GeneratedContent) -> Option<User> {
    let mut user = user?;
    user.usage = user.usage.incremented(content.modality());
    user.history.insert(0, content);
    Some(user)
}
