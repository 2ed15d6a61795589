use anyhow::Result;

use crate::{
    database::RescueDatabase,
    model::{Profile, Role},
};

/// Every profile an identity holds, one per role collection it appears in.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProfiles {
    pub profiles: Vec<Profile>,
}

impl ResolvedProfiles {
    pub fn get(&self, role: Role) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.role == role)
    }

    /// The role to land on when none was asked for: admin, then NGO, then user.
    pub fn primary(&self) -> Option<&Profile> {
        Role::PRECEDENCE.iter().find_map(|role| self.get(*role))
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Looks up profiles by uid. Role comes from which collection holds the document.
pub struct ProfileResolver<'a> {
    db: &'a RescueDatabase,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(db: &'a RescueDatabase) -> Self {
        ProfileResolver { db }
    }

    pub async fn in_role(&self, uid: &str, role: Role) -> Result<Option<Profile>> {
        // Profile documents are keyed by uid.
        let mut found = self
            .db
            .profiles(role)
            .find(uid)
            .await?
            .filter(|profile| profile.uid == uid);

        // The collection is authoritative, not the stored field.
        if let Some(profile) = found.as_mut() {
            profile.role = role;
        }

        Ok(found)
    }

    pub async fn resolve(&self, uid: &str) -> Result<ResolvedProfiles> {
        let mut profiles = Vec::new();
        for role in Role::PRECEDENCE {
            if let Some(profile) = self.in_role(uid, role).await? {
                profiles.push(profile);
            }
        }
        if profiles.len() > 1 {
            tracing::warn!(%uid, roles = profiles.len(), "Identity has profiles in several role collections.");
        }

        Ok(ResolvedProfiles { profiles })
    }
}

#[cfg(test)]
pub mod fixtures {
    use chrono::Utc;

    use crate::model::{Profile, Role};

    pub fn profile(uid: &str, role: Role, name: &str, contact: &str) -> Profile {
        Profile {
            id: uid.to_string(),
            uid: uid.to_string(),
            role,
            name: name.to_string(),
            contact: contact.to_string(),
            email: format!("{}@example.org", uid),
            avatar_url: None,
            banner_url: None,
            address: (role == Role::Ngo).then(|| "12 Shelter Road".to_string()),
            gender: None,
            latitude: None,
            longitude: None,
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::profile;
    use super::*;

    #[tokio::test]
    async fn role_comes_from_collection() {
        let db = RescueDatabase::in_memory();
        // Stored with the wrong role field; it lives in `ngos`.
        db.profiles(Role::Ngo)
            .insert(&profile("n1", Role::User, "Paws NGO", "111"))
            .await
            .unwrap();

        let resolver = ProfileResolver::new(&db);
        let found = resolver.in_role("n1", Role::Ngo).await.unwrap().unwrap();
        assert_eq!(found.role, Role::Ngo);
        assert!(resolver.in_role("n1", Role::User).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_every_collection() {
        let db = RescueDatabase::in_memory();
        db.profiles(Role::User)
            .insert(&profile("x", Role::User, "X", "1"))
            .await
            .unwrap();
        db.profiles(Role::Admin)
            .insert(&profile("x", Role::Admin, "X", "1"))
            .await
            .unwrap();

        let resolved = ProfileResolver::new(&db).resolve("x").await.unwrap();
        assert_eq!(resolved.profiles.len(), 2);
        assert_eq!(resolved.primary().unwrap().role, Role::Admin);
        assert!(resolved.get(Role::Ngo).is_none());

        let nobody = ProfileResolver::new(&db).resolve("y").await.unwrap();
        assert!(nobody.is_empty());
        assert!(nobody.primary().is_none());
    }
}
