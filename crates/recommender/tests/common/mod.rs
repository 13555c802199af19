//! Shared fixture snapshot for integration tests

#![allow(dead_code)]

use maverick_recommender::{Catalog, EngineConfig, Item, ModelBundle, Rating, RatingTable};

pub const SEASONED_USER: u32 = 1;
pub const SPARSE_USER: u32 = 13;
pub const UNKNOWN_USER: u32 = 999;

pub fn catalog() -> Catalog {
    Catalog::new(vec![
        Item::new(1, "Inception", "Sci-Fi|Action")
            .with_overview("A thief enters dreams to plant an idea in a target's mind")
            .with_director("Christopher Nolan"),
        Item::new(2, "Interstellar", "Sci-Fi|Drama")
            .with_overview("Astronauts travel through a wormhole to save humanity")
            .with_director("Christopher Nolan"),
        Item::new(3, "The Matrix", "Sci-Fi|Action")
            .with_overview("A hacker discovers reality is a simulation"),
        Item::new(4, "Titanic", "Romance|Drama")
            .with_overview("A love story aboard the doomed ocean liner"),
        Item::new(5, "The Notebook", "Romance|Drama")
            .with_overview("A love story remembered across decades"),
        Item::new(6, "Heat", "Action|Crime")
            .with_overview("A detective hunts a crew of professional thieves"),
        Item::new(7, "Up", "Animation|Comedy")
            .with_overview("An old man flies his house away with balloons"),
        Item::new(8, "Toy Story", "Animation|Comedy")
            .with_overview("Toys come alive when nobody is watching"),
        Item::new(9, "Alien", "Sci-Fi|Horror")
            .with_overview("A crew is stalked by a creature in space"),
        Item::new(10, "Casablanca", "Romance|Drama")
            .with_overview("An old flame walks into a nightclub during the war"),
    ])
}

/// User 1 rated everything, users 2-12 follow a fixed pattern and
/// user 13 rated two items without liking either
pub fn ratings() -> RatingTable {
    let mut ratings = Vec::new();
    for item in 1..=10 {
        ratings.push(Rating::new(SEASONED_USER, item, if item <= 3 { 5.0 } else { 2.0 }));
    }
    for user in 2..=12u32 {
        for item in 1..=10u32 {
            if (user * 7 + item * 3) % 4 != 0 {
                let value = 1 + (user + 2 * item) % 5;
                ratings.push(Rating::new(user, item, value as f32));
            }
        }
    }
    ratings.push(Rating::new(SPARSE_USER, 4, 3.0));
    ratings.push(Rating::new(SPARSE_USER, 7, 2.0));
    RatingTable::new(ratings)
}

pub fn bundle() -> ModelBundle {
    ModelBundle::train(catalog(), ratings(), &EngineConfig::default())
}
