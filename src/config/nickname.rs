//! Random default nickname.
//!
//! `AdjectiveNounNN` (e.g. `RustyCrab42`), used when a server entry gives
//! no nickname.

use rand::RngExt;

const ADJECTIVES: &[&str] = &[
    "Rusty", "Async", "Idle", "Quiet", "Lazy", "Swift", "Brave", "Calm", "Sly", "Tiny",
];

const NOUNS: &[&str] = &[
    "Crab", "Bot", "Owl", "Fox", "Relay", "Daemon", "Node", "Echo", "Lynx", "Moth",
];

pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let adj = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let num: u8 = rng.random_range(0..100);
    format!("{}{}{}", adj, noun, num)
}
