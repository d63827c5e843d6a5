//! Deterministic shopper names: a first initial and a surname, "K. Walker".
//!
//! All generation is deterministic (same RNG seed = same names).

use crate::rng::SubsystemRng;

pub struct NameGenerator;

impl NameGenerator {
    /// Generate a display name such as "J. Turner".
    pub fn generate_customer_name(rng: &mut SubsystemRng) -> String {
        let initial = Self::generate_initial(rng);
        let surname = Self::generate_surname(rng);
        format!("{initial}. {surname}")
    }

    pub fn generate_initial(rng: &mut SubsystemRng) -> char {
        let offset = rng.next_u64_below(26) as u8;
        (b'A' + offset) as char
    }

    pub fn generate_surname(rng: &mut SubsystemRng) -> &'static str {
        let names = Self::surnames();
        names[rng.pick_index(names.len())]
    }

    fn surnames() -> &'static [&'static str] {
        &[
            "Smith", "Jones", "Taylor", "Brown", "Williams", "Wilson", "Johnson",
            "Davies", "Robinson", "Wright", "Thompson", "Evans", "Walker", "White",
            "Roberts", "Green", "Hall", "Wood", "Jackson", "Clarke", "Patel",
            "Khan", "Lewis", "James", "Phillips", "Mason", "Mitchell", "Rose",
            "Davis", "Rodriguez", "Cox", "Alexander", "Morgan", "Moore", "Scott",
            "Harris", "Edwards", "Hughes", "Turner", "Cooper", "Hill", "Ward",
            "Morris", "King", "Harrison", "Allen", "Baker", "Parker", "Price",
            "Bennett", "Young", "Griffiths", "Kelly", "Cook", "Carter", "Bailey",
            "Collins", "Bell", "Shaw", "Murphy", "Miller", "Richards", "Marshall",
            "Simpson", "Ellis", "Adams", "Singh", "Foster", "Chapman", "Powell",
            "Webb", "Rogers", "Gray", "Hunt", "Owen", "Palmer", "Holmes", "Barnes",
            "Knight", "Lloyd", "Butler", "Russell", "Fisher", "Stevens", "Jenkins",
            "Dixon", "Fletcher", "Fry", "Baxter", "Lawson",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, RngSlot};

    #[test]
    fn name_generation_is_deterministic() {
        let mut rng1 = RngBank::new(12345).stream(RngSlot::Names);
        let mut rng2 = RngBank::new(12345).stream(RngSlot::Names);

        let name1 = NameGenerator::generate_customer_name(&mut rng1);
        let name2 = NameGenerator::generate_customer_name(&mut rng2);

        assert_eq!(name1, name2, "Same seed should produce same name");
    }

    #[test]
    fn names_are_initial_dot_surname() {
        let mut rng = RngBank::new(12345).stream(RngSlot::Names);

        for _ in 0..100 {
            let name = NameGenerator::generate_customer_name(&mut rng);
            let (initial, surname) = name.split_once(". ").expect("initial separator");
            assert_eq!(initial.len(), 1, "bad initial in {name}");
            assert!(initial.chars().all(|c| c.is_ascii_uppercase()));
            assert!(!surname.is_empty());
        }
    }
}
