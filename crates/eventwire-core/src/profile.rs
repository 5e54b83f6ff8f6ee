//! Synthetic payload generation
//!
//! Every dispatched event carries a freshly generated user profile and a
//! random classification label. Generators are pure apart from their RNG
//! state, so a seeded [`RandomPayloads`] is fully deterministic.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::event::EventKind;

// ----------------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub title: String,
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postcode: u32,
}

/// Synthetic user record attached to outbound events as `user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub gender: Gender,
    pub name: Name,
    pub email: String,
    pub login: Login,
    pub location: Location,
    pub dob: String,
    pub phone: String,
    pub nat: String,
}

// ----------------------------------------------------------------------------
// Generator Trait
// ----------------------------------------------------------------------------

/// Source of event labels and profiles
pub trait PayloadGenerator: Send {
    fn classification(&mut self) -> EventKind;
    fn profile(&mut self) -> Profile;
}

// ----------------------------------------------------------------------------
// Random Generator
// ----------------------------------------------------------------------------

const MALE_FIRST: &[&str] = &["James", "Oliver", "Mateo", "Noah", "Lucas", "Henry", "Ethan", "Leo"];
const FEMALE_FIRST: &[&str] = &["Emma", "Ava", "Sofia", "Mia", "Isla", "Chloe", "Nora", "Hazel"];
const LAST: &[&str] = &["Smith", "Garcia", "Nguyen", "Brown", "Muller", "Rossi", "Kim", "Walsh"];
const STREETS: &[&str] = &["Maple", "Oak", "Cedar", "Elm", "Harbor", "Mill", "Park", "Station"];
const STREET_SUFFIX: &[&str] = &["Street", "Avenue", "Road", "Lane", "Way"];
const CITIES: &[(&str, &str)] = &[
    ("Portland", "Oregon"),
    ("Austin", "Texas"),
    ("Boise", "Idaho"),
    ("Madison", "Wisconsin"),
    ("Salem", "Massachusetts"),
    ("Tucson", "Arizona"),
];
const DOMAINS: &[&str] = &["example.com", "mail.test", "inbox.test"];
const NATIONALITIES: &[&str] = &["US", "GB", "CA", "AU", "IE", "NZ"];

/// [`PayloadGenerator`] backed by any [`rand::Rng`]
pub struct RandomPayloads<R = StdRng> {
    rng: R,
}

impl RandomPayloads<StdRng> {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPayloads<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomPayloads<R> {
    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn date_of_birth(&mut self) -> String {
        let year = self.rng.gen_range(1950..2005);
        let month = self.rng.gen_range(1..=12);
        let day = self.rng.gen_range(1..=28);
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| date.format("%a, %d %b %Y").to_string())
            .unwrap_or_default()
    }
}

impl<R: Rng + Send> PayloadGenerator for RandomPayloads<R> {
    fn classification(&mut self) -> EventKind {
        EventKind::from_draw(self.rng.gen_range(0..EventKind::OUTCOMES))
    }

    fn profile(&mut self) -> Profile {
        let gender = if self.rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let (title, first) = match gender {
            Gender::Male => ("Mr", self.pick(MALE_FIRST)),
            Gender::Female => (self.pick(&["Ms", "Mrs", "Miss"]), self.pick(FEMALE_FIRST)),
        };
        let last = self.pick(LAST);
        let username = format!(
            "{}{}{}",
            first.to_lowercase(),
            last.to_lowercase(),
            self.rng.gen_range(10..1000)
        );
        let email = format!("{}.{}@{}", first.to_lowercase(), last.to_lowercase(), self.pick(DOMAINS));
        let (city, state) = CITIES.choose(&mut self.rng).copied().unwrap_or(("Portland", "Oregon"));
        let street = format!(
            "{} {} {}",
            self.rng.gen_range(1..10_000),
            self.pick(STREETS),
            self.pick(STREET_SUFFIX)
        );
        let phone = format!("({}) {}-{}", self.digits(3), self.digits(3), self.digits(4));

        Profile {
            gender,
            name: Name {
                title: title.to_string(),
                first: first.to_string(),
                last: last.to_string(),
            },
            email,
            login: Login { username },
            location: Location {
                street,
                city: city.to_string(),
                state: state.to_string(),
                postcode: self.rng.gen_range(10_000..100_000),
            },
            dob: self.date_of_birth(),
            phone,
            nat: self.pick(NATIONALITIES).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = RandomPayloads::seeded(42);
        let mut b = RandomPayloads::seeded(42);

        for _ in 0..10 {
            assert_eq!(a.classification(), b.classification());
            assert_eq!(a.profile(), b.profile());
        }
    }

    #[test]
    fn test_classification_covers_all_labels() {
        let mut generator = RandomPayloads::seeded(1);
        let seen: HashSet<EventKind> = (0..600).map(|_| generator.classification()).collect();
        assert_eq!(seen.len(), EventKind::OUTCOMES as usize);
    }

    #[test]
    fn test_profiles_are_fresh_per_call() {
        let mut generator = RandomPayloads::seeded(3);
        let profiles: Vec<Profile> = (0..5).map(|_| generator.profile()).collect();
        let distinct: HashSet<String> = profiles.iter().map(|p| format!("{:?}", p)).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_profile_fields_are_populated() {
        let profile = RandomPayloads::seeded(9).profile();

        assert!(profile.email.contains('@'));
        assert!(!profile.login.username.is_empty());
        assert!((10_000..100_000).contains(&profile.location.postcode));
        assert_eq!(profile.phone.len(), "(555) 555-5555".len());
        assert!(!profile.dob.is_empty());
    }
}
