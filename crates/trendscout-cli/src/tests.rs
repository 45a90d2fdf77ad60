use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["trendscout"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_trends_with_defaults() {
    let cli = Cli::try_parse_from(["trendscout", "trends", "--query", "ai automation"])
        .expect("expected valid cli args");
    let Some(Commands::Trends(args)) = cli.command else {
        panic!("expected trends command");
    };
    assert_eq!(args.queries, vec!["ai automation"]);
    assert_eq!(args.time_range, TimeRange::Week);
    assert!(!args.no_cache);
    assert!(!args.json);
    assert!(args.articles.is_empty());
}

#[test]
fn query_is_repeatable() {
    let cli = Cli::try_parse_from([
        "trendscout",
        "trends",
        "-q",
        "side hustle",
        "--query",
        "passive income",
        "--time-range",
        "30d",
        "--no-cache",
        "--json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Trends(QueryArgs {
            ref queries,
            time_range: TimeRange::Month,
            no_cache: true,
            json: true,
            ..
        })) if queries == &["side hustle", "passive income"]
    ));
}

#[test]
fn trends_requires_a_query() {
    assert!(Cli::try_parse_from(["trendscout", "trends"]).is_err());
}

#[test]
fn rejects_unknown_time_range() {
    let result = Cli::try_parse_from(["trendscout", "trends", "-q", "x", "--time-range", "90d"]);
    assert!(result.is_err());
}

#[test]
fn parses_gaps_with_top() {
    let cli = Cli::try_parse_from(["trendscout", "gaps", "-q", "x", "--top", "3"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Gaps { top: Some(3), .. })
    ));
}

#[test]
fn influencers_limit_defaults_to_ten() {
    let cli = Cli::try_parse_from(["trendscout", "influencers", "-q", "x"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Influencers { limit: 10, .. })
    ));
}

#[test]
fn parses_status_with_probe() {
    let cli = Cli::try_parse_from([
        "trendscout",
        "status",
        "--probe-url",
        "https://example.com/",
        "--json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Status {
            probe_url: Some(ref url),
            json: true,
        }) if url == "https://example.com/"
    ));
}

#[test]
fn articles_load_from_json_files() {
    let path = std::env::temp_dir().join(format!("trendscout-article-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, r#"{"title": "Passive income", "content": "Ideas."}"#).unwrap();

    let articles = load_articles(std::slice::from_ref(&path)).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Passive income");

    std::fs::remove_file(&path).ok();
    assert!(load_articles(&[path]).is_err());
}
