use crate::validate::{validate_name, validate_new_user, validate_user_patch};
use crate::{
    CoreError, IdGenerator, NewProfile, NewUser, Profile, ProfileDirectory, ProfileId,
    ProfilePatch, ProfileRepository, User, UserId, UserPatch, UserRepository,
};

/// Upper bound on id draws when a generated id collides with an existing one.
const MAX_ID_ATTEMPTS: usize = 100;

fn fresh_id<F>(ids: &dyn IdGenerator, mut taken: F) -> Result<String, CoreError>
where
    F: FnMut(&str) -> Result<bool, CoreError>,
{
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id();
        if !taken(&id)? {
            return Ok(id);
        }
    }
    Err(CoreError::Repository("failed to generate unique id".into()))
}

/// Profile store: owns the profile set and enforces name uniqueness.
pub struct ProfileService<R: ProfileRepository, G: IdGenerator> {
    repo: R,
    ids: G,
}

impl<R: ProfileRepository, G: IdGenerator> ProfileService<R, G> {
    pub fn new(repo: R, ids: G) -> Self {
        Self { repo, ids }
    }

    /// All profiles in insertion order.
    pub fn find_all(&self) -> Result<Vec<Profile>, CoreError> {
        self.repo.list()
    }

    pub fn find_one(&self, id: &ProfileId) -> Result<Profile, CoreError> {
        self.repo
            .get(id)?
            .ok_or_else(|| CoreError::profile_not_found(id))
    }

    /// Create a profile with a freshly generated id.
    pub fn create(&self, input: NewProfile) -> Result<Profile, CoreError> {
        validate_name("name", &input.name)?;
        let id = fresh_id(&self.ids, |candidate| {
            Ok(self.repo.get(&ProfileId::new(candidate)?)?.is_some())
        })?;
        self.create_with_id(ProfileId::new(id)?, input)
    }

    /// Create a profile under a caller-chosen id (seed data).
    pub(crate) fn create_with_id(
        &self,
        id: ProfileId,
        input: NewProfile,
    ) -> Result<Profile, CoreError> {
        validate_name("name", &input.name)?;
        let profile = Profile {
            id,
            name: input.name,
        };
        self.repo.insert(profile.clone())?;
        Ok(profile)
    }

    /// Rename a profile. An absent name returns the profile unchanged.
    pub fn update(&self, id: &ProfileId, patch: ProfilePatch) -> Result<Profile, CoreError> {
        match patch.name {
            Some(name) => {
                validate_name("name", &name)?;
                self.repo.rename(id, &name)
            }
            None => self.find_one(id),
        }
    }

    /// Delete a profile. Users still referencing it are left as they are.
    pub fn remove(&self, id: &ProfileId) -> Result<(), CoreError> {
        self.repo.delete(id)
    }
}

impl<R: ProfileRepository, G: IdGenerator> ProfileDirectory for ProfileService<R, G> {
    fn find_one(&self, id: &ProfileId) -> Result<Profile, CoreError> {
        ProfileService::find_one(self, id)
    }
}

/// User store: owns the user set, enforces email uniqueness, and checks the
/// profile reference through a read-only [`ProfileDirectory`] at write time.
pub struct UserService<R: UserRepository, D: ProfileDirectory, G: IdGenerator> {
    repo: R,
    profiles: D,
    ids: G,
}

impl<R: UserRepository, D: ProfileDirectory, G: IdGenerator> UserService<R, D, G> {
    pub fn new(repo: R, profiles: D, ids: G) -> Self {
        Self {
            repo,
            profiles,
            ids,
        }
    }

    /// Snapshot of all users in insertion order.
    pub fn find_all(&self) -> Result<Vec<User>, CoreError> {
        self.repo.list()
    }

    pub fn find_one(&self, id: &UserId) -> Result<User, CoreError> {
        self.repo
            .get(id)?
            .ok_or_else(|| CoreError::user_not_found(id))
    }

    /// Users attached to `profile_id`. Fails with `NotFound` when the profile
    /// itself does not exist, even if users still reference it.
    pub fn find_by_profile(&self, profile_id: &ProfileId) -> Result<Vec<User>, CoreError> {
        self.profiles.find_one(profile_id)?;
        self.repo.list_by_profile(profile_id)
    }

    /// Create a user: profile reference first, then email uniqueness.
    pub fn create(&self, input: NewUser) -> Result<User, CoreError> {
        validate_new_user(&input)?;
        self.profiles.find_one(&input.profile_id)?;
        let id = fresh_id(&self.ids, |candidate| {
            Ok(self.repo.get(&UserId::new(candidate)?)?.is_some())
        })?;
        let user = input.into_user(UserId::new(id)?);
        // Email uniqueness is checked by the repository under its lock.
        self.repo.insert(user.clone())?;
        Ok(user)
    }

    /// Merge `patch` onto an existing user. Checks run in order: user exists,
    /// patched profile exists, patched email is free.
    pub fn update(&self, id: &UserId, patch: UserPatch) -> Result<User, CoreError> {
        validate_user_patch(&patch)?;
        self.find_one(id)?;
        if let Some(ref profile_id) = patch.profile_id {
            self.profiles.find_one(profile_id)?;
        }
        self.repo.apply_patch(id, &patch)
    }

    pub fn remove(&self, id: &UserId) -> Result<(), CoreError> {
        self.repo.delete(id)
    }

    /// Flip `is_active` and return the updated user.
    pub fn toggle_status(&self, id: &UserId) -> Result<User, CoreError> {
        self.repo.toggle_active(id)
    }
}
