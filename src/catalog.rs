//! Built-in entity kinds for the Open5e v1 API
//!
//! Field lists, renames and table layouts match the tables earlier importers
//! produced, so new runs append to existing databases without surprises.

use crate::config::EntityKind;
use crate::error::ConfigError;
use crate::schema::{Field, NormalizationRules, Schema};

pub const KIND_NAMES: &[&str] = &["classes", "monsters", "races"];

/// Look up a built-in kind by name
pub fn builtin(name: &str) -> Result<EntityKind, ConfigError> {
    match name {
        "classes" => classes(),
        "monsters" => monsters(),
        "races" => races(),
        other => Err(ConfigError::UnknownKind(other.to_string())),
    }
}

pub fn classes() -> Result<EntityKind, ConfigError> {
    let schema = Schema::new(vec![
        Field::text("Name"),
        Field::text("Slug"),
        Field::text("Description"),
        Field::text("HitDice"),
        Field::text("HpAtFirstLevel"),
        Field::text("HpAtHigherLevels"),
        Field::text("ProficienciesArmor"),
        Field::text("ProficienciesWeapons"),
        Field::text("ProficienciesTools"),
        Field::text("ProficienciesSavingThrows"),
        Field::text("ProficienciesSkills"),
        Field::text("Equipment"),
        Field::text("Table").with_column("class_table"),
        Field::text("SpellcastingAbility"),
        Field::text("SubtypesName"),
        Field::nested("Archetypes"),
        Field::text("DocumentSlug"),
        Field::text("DocumentTitle"),
        Field::text("DocumentLicenseUrl"),
        Field::text("DocumentUrl"),
    ])?;

    let rules = NormalizationRules::new()
        .rename("desc", "Description")
        .rename("hp_at_1st_level", "HpAtFirstLevel")
        .rename("prof_armor", "ProficienciesArmor")
        .rename("prof_weapons", "ProficienciesWeapons")
        .rename("prof_tools", "ProficienciesTools")
        .rename("prof_saving_throws", "ProficienciesSavingThrows")
        .rename("prof_skills", "ProficienciesSkills")
        .rename("class_table", "Table");

    EntityKind::new(
        "classes",
        schema,
        rules,
        "https://api.open5e.com/v1/classes/",
        "class_imports",
    )
}

pub fn monsters() -> Result<EntityKind, ConfigError> {
    let schema = Schema::new(vec![
        Field::nested("Actions"),
        Field::text("Alignment"),
        Field::integer("ArmorClass"),
        Field::text("ArmorDescription"),
        Field::nested("BonusActions"),
        Field::float("ChallengeRating"),
        Field::integer("Charisma"),
        Field::integer("CharismaSave"),
        Field::text("ConditionImmunities"),
        Field::integer("Constitution"),
        Field::integer("ConstitutionSave"),
        Field::text("DamageImmunities"),
        Field::text("DamageResistances"),
        Field::text("DamageVulnerabilities"),
        Field::text("Description"),
        Field::integer("Dexterity"),
        Field::integer("DexteritySave"),
        Field::text("DocumentLicenseUrl"),
        Field::text("DocumentSlug"),
        Field::text("DocumentTitle"),
        Field::text("DocumentUrl"),
        Field::nested("Environments"),
        Field::text("Group").with_column("group_name"),
        Field::integer("HP"),
        Field::text("HitDice"),
        Field::text("Image"),
        Field::integer("Intelligence"),
        Field::integer("IntelligenceSave"),
        Field::text("Languages"),
        Field::nested("LegendaryActions"),
        Field::text("LegendaryDescription"),
        Field::text("Name"),
        Field::integer("Perception"),
        Field::nested("Reactions"),
        Field::text("Senses"),
        Field::text("Size"),
        Field::nested("Skills"),
        Field::text("Slug"),
        Field::nested("SpecialAbilities"),
        Field::nested("Speed"),
        Field::nested("SpellList"),
        Field::integer("Strength"),
        Field::integer("StrengthSave"),
        Field::text("Subtype"),
        Field::text("Type"),
        Field::integer("Wisdom"),
        Field::integer("WisdomSave"),
    ])?;

    let rules = NormalizationRules::new()
        .rename("cr", "ChallengeRating")
        .rename("legendary_desc", "LegendaryDescription")
        .rename("hit_points", "HP")
        .rename("img_main", "Image")
        .rename("armor_desc", "ArmorDescription")
        .rename("desc", "Description");

    EntityKind::new(
        "monsters",
        schema,
        rules,
        "https://api.open5e.com/v1/monsters/",
        "mob_imports",
    )
}

pub fn races() -> Result<EntityKind, ConfigError> {
    let schema = Schema::new(vec![
        Field::text("Age"),
        Field::text("Alignment"),
        Field::nested("Asi"),
        Field::text("AsiDescription"),
        Field::text("Description"),
        Field::text("DocumentLicenseUrl"),
        Field::text("DocumentSlug"),
        Field::text("DocumentTitle"),
        Field::text("DocumentUrl"),
        Field::text("Languages"),
        Field::text("Name"),
        Field::text("Size"),
        Field::text("SizeRaw"),
        Field::text("Slug"),
        Field::nested("Speed"),
        Field::text("SpeedDescription"),
        Field::nested("Subraces"),
        Field::text("Traits"),
        Field::text("Vision"),
    ])?;

    // upstream spells it "licence" on this endpoint
    let rules = NormalizationRules::new()
        .rename("speed_desc", "SpeedDescription")
        .rename("asi_desc", "AsiDescription")
        .rename("desc", "Description")
        .rename("document__licence_url", "DocumentLicenseUrl");

    EntityKind::new(
        "races",
        schema,
        rules,
        "https://api.open5e.com/v1/races/",
        "race_imports",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_are_valid() {
        for name in KIND_NAMES {
            let kind = builtin(name).unwrap();
            assert_eq!(kind.name(), *name);
        }
        assert!(matches!(builtin("spells"), Err(ConfigError::UnknownKind(_))));
    }

    #[test]
    fn test_monster_columns_match_existing_tables() {
        let kind = monsters().unwrap();
        let schema = kind.schema();

        assert_eq!(schema.get("HP").unwrap().column(), "hp");
        assert_eq!(schema.get("Group").unwrap().column(), "group_name");
        assert_eq!(schema.get("SpecialAbilities").unwrap().column(), "special_abilities");
        assert_eq!(kind.normalizer().normalize("cr"), "ChallengeRating");
        assert_eq!(kind.normalizer().normalize("hit_points"), "HP");
    }

    #[test]
    fn test_class_renames() {
        let kind = classes().unwrap();
        let normalizer = kind.normalizer();

        assert_eq!(normalizer.normalize("hp_at_1st_level"), "HpAtFirstLevel");
        assert_eq!(normalizer.normalize("prof_saving_throws"), "ProficienciesSavingThrows");
        assert_eq!(normalizer.normalize("document__license_url"), "DocumentLicenseUrl");
        assert_eq!(normalizer.normalize("class_table"), "Table");
        assert_eq!(normalizer.normalize("table"), "Table");
        assert_eq!(kind.schema().get("Table").unwrap().column(), "class_table");
    }

    #[test]
    fn test_race_licence_spelling() {
        let kind = races().unwrap();
        assert_eq!(kind.normalizer().normalize("document__licence_url"), "DocumentLicenseUrl");
    }
}
