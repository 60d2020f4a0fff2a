//! Demo data loader. Safe to re-run: existing rows are cleared first.

use crate::{
    domain::{MemeRepository, UserRepository},
    errors::RepoError,
    models::{NewMeme, NewUser},
};

pub async fn run(memes: &dyn MemeRepository, users: &dyn UserRepository) -> Result<(), RepoError> {
    let removed_memes = memes.delete_all().await?;
    let removed_users = users.delete_all().await?;
    tracing::debug!(removed_memes, removed_users, "Seed: cleared existing data");

    let alice = users
        .create(NewUser {
            username: "alice".to_string(),
            password: "pass1".to_string(),
        })
        .await?;
    let bob = users
        .create(NewUser {
            username: "bob".to_string(),
            password: "pass2".to_string(),
        })
        .await?;

    let rows = [
        ("Distracted Boyfriend", "https://i.imgur.com/example1.jpg", alice.id),
        ("Success Kid", "https://i.imgur.com/example2.jpg", alice.id),
        ("Doge", "https://i.imgur.com/example3.jpg", bob.id),
    ];
    for (title, url, user_id) in rows {
        memes
            .create(NewMeme {
                title: title.to_string(),
                url: url.to_string(),
                user_id,
            })
            .await?;
    }

    tracing::info!(users = 2, memes = rows.len(), "Seed: data loaded");
    Ok(())
}
