use reaction_game::AppConfig;

#[test]
fn config_defaults_and_validation() {
    let cfg = AppConfig::from_json("{}").expect("defaults are valid");
    assert_eq!(cfg.gpio.led_line, 18);
    assert_eq!(cfg.gpio.button_line, 24);
    assert_eq!(cfg.gpio.led_consumer(), "reaction_game_led");
    assert_eq!(cfg.game.min_delay_ms, 2000);
    assert_eq!(cfg.game.max_delay_ms, 6000);
    assert_eq!(cfg.game.poll_interval_ms, 50);

    assert!(AppConfig::from_json(r#"{"game": {"min_delay_ms": 6000}}"#).is_err());
    assert!(AppConfig::from_json(r#"{"gpio": {"button_line": 18}}"#).is_err());
    assert!(AppConfig::from_json(r#"{"game": {"poll_interval_ms": 0}}"#).is_err());
    assert!(AppConfig::from_json("not json").is_err());
}

#[test]
fn unix_socket_alone_is_a_valid_listener() {
    let cfg = AppConfig::from_json(r#"{"http": {"host": null, "unix_socket": "/tmp/game.sock"}}"#)
        .expect("socket-only config is valid");
    assert!(cfg.http.host.is_none());
    assert_eq!(cfg.http.unix_socket.as_deref(), Some("/tmp/game.sock"));

    assert!(AppConfig::from_json(r#"{"http": {"host": null}}"#).is_err());
}
