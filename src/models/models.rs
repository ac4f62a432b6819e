use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Followers,
    Private,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct Equipment {
    pub telescope: Option<String>,
    pub camera: Option<String>,
    pub mount: Option<String>,
    pub other: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_picture: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub interests: Vec<String>,
    pub equipment: Equipment,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub role: Role,
    pub created_at: String,
    pub last_active: String,
}

impl User {
    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    pub fn following_count(&self) -> usize {
        self.following.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostImage {
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct AstronomyData {
    pub object_name: Option<String>,
    pub object_type: Option<String>,
    pub right_ascension: Option<String>,
    pub declination: Option<String>,
    pub capture_date: Option<String>,
    pub location: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    pub images: Vec<PostImage>,
    pub astronomy_data: AstronomyData,
    pub tags: Vec<String>,
    pub likes: Vec<String>,
    pub comments: Vec<String>,
    pub visibility: Visibility,
    pub community: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub post: String,
    pub author: String,
    pub content: String,
    pub likes: Vec<String>,
    pub parent_comment: Option<String>,
    pub replies: Vec<String>,
    pub is_edited: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Comment {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum CommunityPrivacy {
    Public,
    Private,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub admin: String,
    pub moderators: Vec<String>,
    pub members: Vec<String>,
    pub privacy: CommunityPrivacy,
    pub created_at: String,
}

impl Community {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image: Option<String>,
    pub in_stock: bool,
    pub stock: u32,
    pub featured: bool,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CelestialEvent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub peak_time: Option<String>,
    pub visibility_region: String,
    pub magnitude: Option<f64>,
    pub constellation: Option<String>,
    pub tips: Vec<String>,
    pub source: String,
    pub status: EventStatus,
    pub rejection_reason: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub sender: String,
    pub kind: String,
    pub post: Option<String>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
