use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::{
    unique_key, CoreError, Entity, Profile, ProfileId, ProfileRepository, User, UserId, UserPatch,
    UserRepository,
};

fn poisoned<T>(_: T) -> CoreError {
    CoreError::Repository("mutex poisoned".into())
}

#[derive(Default)]
struct ProfileTable {
    order: Vec<ProfileId>,
    rows: HashMap<ProfileId, Profile>,
    /// unique_key(name) -> owner
    by_name: HashMap<String, ProfileId>,
}

#[derive(Default)]
struct UserTable {
    order: Vec<UserId>,
    rows: HashMap<UserId, User>,
    /// unique_key(email) -> owner
    by_email: HashMap<String, UserId>,
}

/// In-memory profile repository. A single mutex guards the records and the
/// name index, so every check-then-mutate sequence runs under one lock.
#[derive(Default)]
pub struct InMemoryProfileRepo {
    inner: Mutex<ProfileTable>,
}

/// In-memory user repository, same locking model as [`InMemoryProfileRepo`].
#[derive(Default)]
pub struct InMemoryUserRepo {
    inner: Mutex<UserTable>,
}

impl InMemoryProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProfileTable>, CoreError> {
        self.inner.lock().map_err(poisoned)
    }
}

impl ProfileRepository for InMemoryProfileRepo {
    fn list(&self) -> Result<Vec<Profile>, CoreError> {
        let table = self.lock()?;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.rows.get(id))
            .cloned()
            .collect())
    }

    fn get(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError> {
        let table = self.lock()?;
        Ok(table.rows.get(id).cloned())
    }

    fn insert(&self, profile: Profile) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        if table.rows.contains_key(&profile.id) {
            return Err(CoreError::conflict(Entity::Profile, "id", profile.id.as_str()));
        }
        let key = unique_key(&profile.name);
        if table.by_name.contains_key(&key) {
            return Err(CoreError::conflict(Entity::Profile, "name", &profile.name));
        }
        table.by_name.insert(key, profile.id.clone());
        table.order.push(profile.id.clone());
        table.rows.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn rename(&self, id: &ProfileId, name: &str) -> Result<Profile, CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        let Some(profile) = table.rows.get_mut(id) else {
            return Err(CoreError::profile_not_found(id));
        };
        let key = unique_key(name);
        if table.by_name.get(&key).is_some_and(|owner| owner != id) {
            return Err(CoreError::conflict(Entity::Profile, "name", name));
        }
        table.by_name.remove(&unique_key(&profile.name));
        table.by_name.insert(key, id.clone());
        profile.name = name.to_string();
        Ok(profile.clone())
    }

    fn delete(&self, id: &ProfileId) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        let Some(profile) = table.rows.remove(id) else {
            return Err(CoreError::profile_not_found(id));
        };
        table.by_name.remove(&unique_key(&profile.name));
        table.order.retain(|p| p != id);
        Ok(())
    }
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, UserTable>, CoreError> {
        self.inner.lock().map_err(poisoned)
    }
}

impl UserRepository for InMemoryUserRepo {
    fn list(&self) -> Result<Vec<User>, CoreError> {
        let table = self.lock()?;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.rows.get(id))
            .cloned()
            .collect())
    }

    fn get(&self, id: &UserId) -> Result<Option<User>, CoreError> {
        let table = self.lock()?;
        Ok(table.rows.get(id).cloned())
    }

    fn list_by_profile(&self, profile_id: &ProfileId) -> Result<Vec<User>, CoreError> {
        let table = self.lock()?;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.rows.get(id))
            .filter(|u| &u.profile_id == profile_id)
            .cloned()
            .collect())
    }

    fn insert(&self, user: User) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        if table.rows.contains_key(&user.id) {
            return Err(CoreError::conflict(Entity::User, "id", user.id.as_str()));
        }
        let key = unique_key(&user.email);
        if table.by_email.contains_key(&key) {
            return Err(CoreError::conflict(Entity::User, "email", &user.email));
        }
        table.by_email.insert(key, user.id.clone());
        table.order.push(user.id.clone());
        table.rows.insert(user.id.clone(), user);
        Ok(())
    }

    fn apply_patch(&self, id: &UserId, patch: &UserPatch) -> Result<User, CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        let Some(user) = table.rows.get_mut(id) else {
            return Err(CoreError::user_not_found(id));
        };
        // Email is the only indexed field; re-key it before merging.
        if let Some(ref email) = patch.email {
            let key = unique_key(email);
            if table.by_email.get(&key).is_some_and(|owner| owner != id) {
                return Err(CoreError::conflict(Entity::User, "email", email));
            }
            table.by_email.remove(&unique_key(&user.email));
            table.by_email.insert(key, id.clone());
        }
        patch.apply_to(user);
        Ok(user.clone())
    }

    fn toggle_active(&self, id: &UserId) -> Result<User, CoreError> {
        let mut table = self.lock()?;
        match table.rows.get_mut(id) {
            Some(user) => {
                user.is_active = !user.is_active;
                Ok(user.clone())
            }
            None => Err(CoreError::user_not_found(id)),
        }
    }

    fn delete(&self, id: &UserId) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        let table = &mut *guard;
        let Some(user) = table.rows.remove(id) else {
            return Err(CoreError::user_not_found(id));
        };
        table.by_email.remove(&unique_key(&user.email));
        table.order.retain(|u| u != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_profile(id: &str, name: &str) -> Profile {
        Profile {
            id: ProfileId::new(id).unwrap(),
            name: name.to_string(),
        }
    }

    fn mk_user(id: &str, email: &str) -> User {
        User {
            id: UserId::new(id).unwrap(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: email.to_string(),
            is_active: true,
            profile_id: ProfileId::new("1").unwrap(),
        }
    }

    #[test]
    fn profile_list_keeps_insertion_order() {
        let repo = InMemoryProfileRepo::new();
        for (id, name) in [("b", "Zeta"), ("a", "Alpha"), ("c", "Mid")] {
            repo.insert(mk_profile(id, name)).unwrap();
        }
        let names: Vec<_> = repo.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn profile_insert_rejects_duplicate_name_any_case() {
        let repo = InMemoryProfileRepo::new();
        repo.insert(mk_profile("1", "Admin")).unwrap();
        let err = repo.insert(mk_profile("2", "ADMIN")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { field: "name", .. }));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn profile_insert_rejects_duplicate_id() {
        let repo = InMemoryProfileRepo::new();
        repo.insert(mk_profile("1", "Admin")).unwrap();
        let err = repo.insert(mk_profile("1", "Other")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { field: "id", .. }));
    }

    #[test]
    fn rename_moves_the_name_index() {
        let repo = InMemoryProfileRepo::new();
        let id = ProfileId::new("1").unwrap();
        repo.insert(mk_profile("1", "Admin")).unwrap();
        repo.rename(&id, "Root").unwrap();
        // Old name is free again, new one is taken.
        repo.insert(mk_profile("2", "admin")).unwrap();
        let err = repo.insert(mk_profile("3", "root")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn rename_checks_existence_before_conflict() {
        let repo = InMemoryProfileRepo::new();
        repo.insert(mk_profile("1", "Admin")).unwrap();
        let missing = ProfileId::new("9").unwrap();
        let err = repo.rename(&missing, "Admin").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn delete_frees_name_and_id() {
        let repo = InMemoryProfileRepo::new();
        let id = ProfileId::new("1").unwrap();
        repo.insert(mk_profile("1", "Admin")).unwrap();
        repo.delete(&id).unwrap();
        assert!(repo.get(&id).unwrap().is_none());
        assert!(matches!(repo.delete(&id), Err(CoreError::NotFound { .. })));
        repo.insert(mk_profile("1", "admin")).unwrap();
    }

    #[test]
    fn user_patch_rekeys_email() {
        let repo = InMemoryUserRepo::new();
        let id = UserId::new("u1").unwrap();
        repo.insert(mk_user("u1", "old@example.com")).unwrap();
        let patch = UserPatch {
            email: Some("New@Example.com".into()),
            ..Default::default()
        };
        let updated = repo.apply_patch(&id, &patch).unwrap();
        assert_eq!(updated.email, "New@Example.com");
        repo.insert(mk_user("u2", "old@example.com")).unwrap();
        let err = repo.insert(mk_user("u3", "new@example.com")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { field: "email", .. }));
    }

    #[test]
    fn user_patch_conflict_leaves_record_untouched() {
        let repo = InMemoryUserRepo::new();
        let id = UserId::new("u1").unwrap();
        repo.insert(mk_user("u1", "a@example.com")).unwrap();
        repo.insert(mk_user("u2", "b@example.com")).unwrap();
        let patch = UserPatch {
            first_name: Some("Changed".into()),
            email: Some("B@example.com".into()),
            ..Default::default()
        };
        assert!(repo.apply_patch(&id, &patch).is_err());
        let stored = repo.get(&id).unwrap().unwrap();
        assert_eq!(stored.first_name, "John");
        assert_eq!(stored.email, "a@example.com");
    }

    #[test]
    fn user_toggle_and_delete() {
        let repo = InMemoryUserRepo::new();
        let id = UserId::new("u1").unwrap();
        repo.insert(mk_user("u1", "a@example.com")).unwrap();
        assert!(!repo.toggle_active(&id).unwrap().is_active);
        repo.delete(&id).unwrap();
        assert!(matches!(
            repo.toggle_active(&id),
            Err(CoreError::NotFound { .. })
        ));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn concurrent_inserts_keep_email_unique() {
        let repo = InMemoryUserRepo::new();
        let inserted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let repo = &repo;
                    s.spawn(move || {
                        let email = if i % 2 == 0 { "a@b.com" } else { "A@B.COM" };
                        repo.insert(mk_user(&format!("u{i}"), email)).is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(inserted, 1);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_renames_keep_name_unique() {
        let repo = InMemoryProfileRepo::new();
        for i in 0..8 {
            repo.insert(mk_profile(&i.to_string(), &format!("Profile {i}"))).unwrap();
        }
        let renamed = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let repo = &repo;
                    s.spawn(move || {
                        let name = if i % 2 == 0 { "Shared" } else { "SHARED" };
                        let id = ProfileId::new(i.to_string()).unwrap();
                        repo.rename(&id, name).is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(renamed, 1);
        let shared = repo
            .list()
            .unwrap()
            .into_iter()
            .filter(|p| unique_key(&p.name) == "shared")
            .count();
        assert_eq!(shared, 1);
    }

    #[test]
    fn poisoned_lock_is_a_repository_error() {
        let repo = InMemoryUserRepo::new();
        let id = UserId::new("u1").unwrap();
        repo.insert(mk_user("u1", "a@example.com")).unwrap();
        std::thread::scope(|s| {
            let res = s
                .spawn(|| {
                    let _guard = repo.inner.lock().unwrap();
                    panic!("panic while holding the user table lock");
                })
                .join();
            assert!(res.is_err());
        });

        assert!(matches!(repo.list(), Err(CoreError::Repository(_))));
        assert!(matches!(
            repo.insert(mk_user("u2", "b@example.com")),
            Err(CoreError::Repository(_))
        ));
        assert!(matches!(repo.toggle_active(&id), Err(CoreError::Repository(_))));
    }

    #[test]
    fn poisoned_profile_lock_is_a_repository_error() {
        let repo = InMemoryProfileRepo::new();
        std::thread::scope(|s| {
            let res = s
                .spawn(|| {
                    let _guard = repo.inner.lock().unwrap();
                    panic!("panic while holding the profile table lock");
                })
                .join();
            assert!(res.is_err());
        });

        assert!(matches!(repo.list(), Err(CoreError::Repository(_))));
        assert!(matches!(
            repo.insert(mk_profile("1", "Admin")),
            Err(CoreError::Repository(_))
        ));
    }
}
