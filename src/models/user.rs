use mongodb::bson::oid::ObjectId;

/// Caller identity, injected into request extensions by `auth::inject_current_user`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub name: String,
}
