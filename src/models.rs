use serde::Serialize;

/// An account that owns memes. Rows are created by the seed routine only.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub user_id: i64,
}

/// Minimal projection of the owning user attached to list results.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MemeWithOwner {
    #[serde(flatten)]
    pub meme: Meme,
    pub user: Option<UserSummary>,
}

/// Validated input for a new meme; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeme {
    pub title: String,
    pub url: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Validated partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemeChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub user_id: Option<i64>,
}

impl MemeChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.user_id.is_none()
    }

    pub fn apply_to(&self, meme: &mut Meme) {
        if let Some(title) = &self.title {
            meme.title = title.clone();
        }
        if let Some(url) = &self.url {
            meme.url = url.clone();
        }
        if let Some(user_id) = self.user_id {
            meme.user_id = user_id;
        }
    }
}
