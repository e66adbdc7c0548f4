use roster_core::{
    InvariantViolation, Item, ItemRef, ItemUpdate, JsonTierRepository, RankLabel, RepoError,
    RosterService, Tier, TierRepository, TierSet,
};
use proptest::prelude::*;

fn top_item(name: &str) -> Item {
    let mut item = Item::new(name, "creator");
    item.history = Some(vec![format!("2024-01-01: Placed {name}")]);
    item
}

fn sample_tiers() -> TierSet {
    let mut alpha = top_item("Alpha");
    alpha.media = Some("https://video.example/alpha".to_string());
    alpha.rank_label = RankLabel::Extreme;
    alpha.scale = "10/10".to_string();
    alpha.external_position = Some(3);

    let mut beta = Item::new("Beta", "someone else");
    beta.rank_label = RankLabel::from("Mythic");
    beta.external_position = Some(0);

    let mut gamma = Item::new("Gamma", "third");
    gamma.rank_label = RankLabel::Easy;

    TierSet {
        top: vec![alpha, top_item("Delta")],
        mid: vec![beta],
        overflow: vec![gamma],
    }
}

#[test]
fn missing_tier_files_load_as_empty_roster() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path().join("data"));

    let tiers = repo.load().unwrap();
    assert_eq!(tiers, TierSet::new());
}

#[test]
fn save_then_load_roundtrips_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    let tiers = sample_tiers();

    repo.save(&tiers).unwrap();
    let loaded = repo.load().unwrap();

    assert_eq!(loaded, tiers);
    assert_eq!(loaded.mid[0].rank_label, RankLabel::Other("Mythic".to_string()));
    assert_eq!(loaded.mid[0].external_position, Some(0));
}

#[test]
fn resave_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    repo.save(&sample_tiers()).unwrap();
    let before: Vec<Vec<u8>> = repo
        .artifact_paths()
        .iter()
        .map(|path| std::fs::read(path).unwrap())
        .collect();

    let loaded = repo.load().unwrap();
    repo.save(&loaded).unwrap();

    let after: Vec<Vec<u8>> = repo
        .artifact_paths()
        .iter()
        .map(|path| std::fs::read(path).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn tier_files_omit_absent_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    repo.save(&sample_tiers()).unwrap();

    let top: serde_json::Value =
        serde_json::from_slice(&std::fs::read(repo.tier_path(Tier::Top)).unwrap()).unwrap();
    let mid: serde_json::Value =
        serde_json::from_slice(&std::fs::read(repo.tier_path(Tier::Mid)).unwrap()).unwrap();

    assert_eq!(top[0]["rank_label"], "Extreme");
    assert!(top[0]["history"].is_array());
    assert!(top[1].get("media").is_none());
    assert!(mid[0].get("history").is_none());
    assert_eq!(mid[0]["rank_label"], "Mythic");
}

#[test]
fn save_rejects_history_outside_top_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    let mut tiers = sample_tiers();
    tiers.mid[0].history = Some(vec!["stale".to_string()]);

    let err = repo.save(&tiers).unwrap_err();
    match err {
        RepoError::Invariant(violations) => {
            assert_eq!(
                violations,
                vec![InvariantViolation::UnexpectedHistory {
                    tier: Tier::Mid,
                    name: "Beta".to_string()
                }]
            );
        }
        other => panic!("expected invariant error, got {other}"),
    }
    assert!(!repo.tier_path(Tier::Top).exists());
}

#[test]
fn malformed_json_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    std::fs::write(repo.tier_path(Tier::Mid), b"{ not json").unwrap();

    let err = repo.load().unwrap_err();
    assert!(matches!(err, RepoError::Json { ref path, .. } if path.ends_with("mid.json")));
}

#[test]
fn load_keeps_invalid_data_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    std::fs::write(
        repo.tier_path(Tier::Top),
        br#"[{"name": "NoHistory", "creator": "c"}]"#,
    )
    .unwrap();

    let tiers = repo.load().unwrap();
    assert_eq!(tiers.top.len(), 1);
    assert!(!tiers.top[0].has_history());
    assert_eq!(tiers.top[0].rank_label, RankLabel::Other(String::new()));
}

#[test]
fn writes_succeed_on_top_of_legacy_history_breaches() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonTierRepository::new(dir.path());
    std::fs::write(repo.tier_path(Tier::Top), br#"[{"name": "Legacy"}]"#).unwrap();
    std::fs::write(
        repo.tier_path(Tier::Mid),
        br#"[{"name": "Other", "creator": "old", "history": ["stale"]}]"#,
    )
    .unwrap();
    let service = RosterService::new(&repo).with_date("2024-02-02");

    let outcome = service
        .edit(
            &ItemRef::Name("Other".to_string()),
            &ItemUpdate {
                creator: Some("new".to_string()),
                ..ItemUpdate::default()
            },
        )
        .unwrap();
    assert!(outcome.modified);

    let tiers = repo.load().unwrap();
    assert!(tiers.validate().is_empty());
    assert_eq!(tiers.mid[0].creator, "new");
    assert!(!tiers.mid[0].has_history());
    assert_eq!(
        tiers.top[0].history,
        Some(vec!["2024-02-02: Recorded at #1".to_string()])
    );
}

fn label_strategy() -> impl Strategy<Value = RankLabel> {
    prop_oneof![
        Just(RankLabel::Extreme),
        Just(RankLabel::Insane),
        Just(RankLabel::Hard),
        Just(RankLabel::Medium),
        Just(RankLabel::Easy),
        "[A-Za-z ]{0,10}".prop_map(RankLabel::from),
    ]
}

fn item_strategy(in_top: bool) -> impl Strategy<Value = Item> {
    let history = if in_top {
        prop::collection::vec("\\PC{0,24}", 1..4).prop_map(Some).boxed()
    } else {
        Just(None).boxed()
    };
    (
        "[A-Za-z][A-Za-z0-9 ]{0,15}",
        "\\PC{0,12}",
        prop::option::of("\\PC{0,20}"),
        label_strategy(),
        "[0-9/]{0,5}",
        prop::option::of(0u32..500),
        history,
    )
        .prop_map(
            |(name, creator, media, rank_label, scale, external_position, history)| Item {
                name,
                creator,
                media,
                rank_label,
                scale,
                external_position,
                history,
            },
        )
}

fn tier_set_strategy() -> impl Strategy<Value = TierSet> {
    (
        prop::collection::vec(item_strategy(true), 0..8),
        prop::collection::vec(item_strategy(false), 0..8),
        prop::collection::vec(item_strategy(false), 0..8),
    )
        .prop_map(|(top, mid, overflow)| TierSet { top, mid, overflow })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_valid_state_roundtrips_through_files(tiers in tier_set_strategy()) {
        prop_assume!(tiers.validate().is_empty());
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonTierRepository::new(dir.path());

        repo.save(&tiers).unwrap();
        let first = std::fs::read(repo.tier_path(Tier::Top)).unwrap();
        let loaded = repo.load().unwrap();
        prop_assert_eq!(&loaded, &tiers);

        repo.save(&loaded).unwrap();
        prop_assert_eq!(std::fs::read(repo.tier_path(Tier::Top)).unwrap(), first);
    }
}
