//! Demo data loaded at startup so a fresh process has something to show.

use crate::service::{ProfileService, UserService};
use crate::{
    CoreError, IdGenerator, NewProfile, NewUser, ProfileDirectory, ProfileId, ProfileRepository,
    UserRepository,
};

/// Profiles with fixed ids; clients may rely on `"1"` being the admin profile.
pub const SEED_PROFILES: [(&str, &str); 3] = [("1", "Admin"), ("2", "Developer"), ("3", "User")];

/// (first name, last name, email)
pub const SEED_USERS: [(&str, &str, &str); 5] = [
    ("John", "Doe", "john.doe@example.com"),
    ("Jane", "Smith", "jane.smith@example.com"),
    ("Bob", "Johnson", "bob.johnson@example.com"),
    ("Alice", "Williams", "alice.williams@example.com"),
    ("Charlie", "Brown", "charlie.brown@example.com"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub profiles: usize,
    pub users: usize,
}

/// Populate empty stores through their regular write paths. Users are spread
/// round-robin over the seeded profiles and alternate between active and
/// inactive.
pub fn seed_demo_data<PR, PG, UR, D, UG>(
    profiles: &ProfileService<PR, PG>,
    users: &UserService<UR, D, UG>,
) -> Result<SeedSummary, CoreError>
where
    PR: ProfileRepository,
    PG: IdGenerator,
    UR: UserRepository,
    D: ProfileDirectory,
    UG: IdGenerator,
{
    let mut seeded_profiles = Vec::with_capacity(SEED_PROFILES.len());
    for (id, name) in SEED_PROFILES {
        let profile = profiles.create_with_id(
            ProfileId::new(id)?,
            NewProfile {
                name: name.to_string(),
            },
        )?;
        seeded_profiles.push(profile.id);
    }

    for (i, (first, last, email)) in SEED_USERS.into_iter().enumerate() {
        users.create(NewUser {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            is_active: i % 2 == 0,
            profile_id: seeded_profiles[i % seeded_profiles.len()].clone(),
        })?;
    }

    Ok(SeedSummary {
        profiles: SEED_PROFILES.len(),
        users: SEED_USERS.len(),
    })
}
