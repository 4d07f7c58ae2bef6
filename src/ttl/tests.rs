use super::*;

#[test]
fn test_labels_round_trip() {
    for data_type in [
        DataType::AudioFeatures,
        DataType::Playlist,
        DataType::TrackDetails,
        DataType::AlbumDetails,
        DataType::ArtistDetails,
    ] {
        assert_eq!(DataType::from_label(data_type.as_str()), data_type);
        assert!(data_type.is_known());
    }
}

#[test]
fn test_unknown_label_is_other() {
    let data_type: DataType = "podcast_episode".parse().unwrap();
    assert_eq!(data_type.as_str(), "podcast_episode");
    assert!(!data_type.is_known());
}

#[test]
fn test_label_is_normalized() {
    assert_eq!(DataType::from(" Playlist "), DataType::Playlist);
    let other = DataType::from("Top_Tracks");
    assert!(!other.is_known());
    assert_eq!(other.as_str(), "top_tracks");
    assert_eq!(other, DataType::from("top_tracks"));
}

#[test]
fn test_default_policy_values() {
    let policy = TtlPolicy::default();

    assert_eq!(policy.ttl_for(&DataType::Playlist), Duration::from_secs(3600));
    assert_eq!(
        policy.ttl_for(&DataType::AudioFeatures),
        Duration::from_secs(7 * 24 * 3600)
    );
    assert_eq!(
        policy.ttl_for(&DataType::TrackDetails),
        Duration::from_secs(24 * 3600)
    );
    assert_eq!(
        policy.ttl_for(&DataType::AlbumDetails),
        policy.ttl_for(&DataType::ArtistDetails)
    );
}

#[test]
fn test_misspelled_type_falls_back_to_default() {
    let policy = TtlPolicy::default().with_ttl(&DataType::Playlist, Duration::from_secs(60));

    assert_eq!(policy.ttl_for(&DataType::from("playlsit")), policy.default);
    assert_eq!(policy.ttl_for(&DataType::from("playlist")), Duration::from_secs(60));
}

#[test]
fn test_with_ttl_on_other_changes_default() {
    let policy =
        TtlPolicy::default().with_ttl(&DataType::from("anything"), Duration::from_secs(5));

    assert_eq!(policy.default, Duration::from_secs(5));
    assert_eq!(policy.ttl_for(&DataType::from("something_else")), Duration::from_secs(5));
}

#[test]
fn test_first_zero() {
    assert_eq!(TtlPolicy::default().first_zero(), None);

    let policy = TtlPolicy::default().with_ttl(&DataType::Playlist, Duration::ZERO);
    assert_eq!(policy.first_zero(), Some("playlist"));
}

#[test]
fn test_data_type_serde_as_label() {
    let json = serde_json::to_string(&DataType::TrackDetails).unwrap();
    assert_eq!(json, "\"track_details\"");

    let parsed: DataType = serde_json::from_str("\"misc\"").unwrap();
    assert_eq!(parsed, DataType::from("misc"));
    assert!(matches!(parsed, DataType::Other(ref label) if label.as_str() == "misc"));
}

#[test]
fn test_other_never_shadows_dedicated_type() {
    for label in ["playlist", "PLAYLIST", " audio_features", "Artist_Details"] {
        let data_type = DataType::from_label(label);
        assert!(data_type.is_known(), "{label} should map to a dedicated type");
    }
    assert_eq!(DataType::from("PlayList"), DataType::Playlist);
}
