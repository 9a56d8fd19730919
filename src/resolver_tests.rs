//! Unit tests for mirror failover and the cardinality gate.

use super::*;
use crate::fetch::{FetchError, MockIndexFetcher};
use crate::index::NamingScheme;
use mockall::predicate::eq;
use rstest::rstest;

const MIRROR_A: &str = "http://a.test/pool/";
const MIRROR_B: &str = "http://b.test/pool/";
const MIRROR_C: &str = "http://c.test/pool/";

fn search(role: ArtifactRole, mirrors: &[&str]) -> RoleSearch {
    RoleSearch {
        role,
        mirrors: mirrors.iter().map(|m| (*m).to_owned()).collect(),
        matcher: PackageIndexMatcher::new(vec![
            NamingScheme::new("only", r#"href="(pkg-[a-z]+_1\.0_amd64\.deb)""#).expect("valid"),
        ]),
    }
}

fn link(filename: &str) -> String {
    format!("<a href=\"{filename}\">{filename}</a>\n")
}

fn refused(url: &str) -> FetchError {
    FetchError::HttpError {
        url: url.to_owned(),
        reason: "connection refused".to_owned(),
    }
}

#[test]
fn first_matching_mirror_wins_and_later_mirrors_are_not_fetched() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_A))
        .times(1)
        .returning(|_| Ok(link("unrelated_2.0_amd64.deb")));
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_B))
        .times(1)
        .returning(|_| Ok(link("pkg-headers_1.0_amd64.deb")));
    fetcher.expect_fetch_index().with(eq(MIRROR_C)).times(0);

    let artifact = resolve_role(
        &fetcher,
        &search(ArtifactRole::Headers, &[MIRROR_A, MIRROR_B, MIRROR_C]),
    )
    .expect("mirror B matches");

    assert_eq!(artifact.url, "http://b.test/pool/pkg-headers_1.0_amd64.deb");
    assert_eq!(artifact.role, ArtifactRole::Headers);
}

#[test]
fn transport_failures_advance_to_next_mirror() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_A))
        .times(1)
        .returning(|url| Err(refused(url)));
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_B))
        .times(1)
        .returning(|url| Err(FetchError::NotFound { url: url.to_owned() }));
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_C))
        .times(1)
        .returning(|_| Ok(link("pkg-kbuild_1.0_amd64.deb")));

    let artifact = resolve_role(
        &fetcher,
        &search(ArtifactRole::BuildSupport, &[MIRROR_A, MIRROR_B, MIRROR_C]),
    )
    .expect("mirror C matches");
    assert!(artifact.url.starts_with(MIRROR_C));
}

#[test]
fn exhausted_mirrors_name_the_unsatisfied_role() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher
        .expect_fetch_index()
        .times(2)
        .returning(|_| Ok(link("unrelated_2.0_amd64.deb")));

    let err = resolve_role(
        &fetcher,
        &search(ArtifactRole::CommonHeaders, &[MIRROR_A, MIRROR_B]),
    )
    .expect_err("nothing matches");
    assert_eq!(
        err,
        ResolutionError::ArtifactNotFound {
            role: ArtifactRole::CommonHeaders
        }
    );
    assert!(err.to_string().contains("common-headers"));
}

#[test]
fn roles_sharing_a_mirror_fetch_it_once() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher
        .expect_fetch_index()
        .with(eq(MIRROR_A))
        .times(1)
        .returning(|_| {
            Ok(format!(
                "{}{}",
                link("pkg-headers_1.0_amd64.deb"),
                link("pkg-common_1.0_amd64.deb")
            ))
        });
    fetcher.expect_probe().times(2).returning(|_| Ok(()));

    let mut headers = search(ArtifactRole::Headers, &[MIRROR_A]);
    headers.matcher = PackageIndexMatcher::new(vec![
        NamingScheme::new("headers", r#"href="(pkg-headers_[^"]*\.deb)""#).expect("valid"),
    ]);
    let mut common = search(ArtifactRole::CommonHeaders, &[MIRROR_A]);
    common.matcher = PackageIndexMatcher::new(vec![
        NamingScheme::new("common", r#"href="(pkg-common_[^"]*\.deb)""#).expect("valid"),
    ]);
    let plan = ResolutionPlan {
        searches: vec![headers, common],
        min_artifacts: 2,
    };

    let set = resolve(&fetcher, &plan, None).expect("both roles resolve");
    assert_eq!(
        set.urls(),
        vec![
            "http://a.test/pool/pkg-headers_1.0_amd64.deb",
            "http://a.test/pool/pkg-common_1.0_amd64.deb"
        ]
    );
}

#[test]
fn unreachable_resolved_url_trips_the_cardinality_gate() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher.expect_fetch_index().returning(|_| {
        Ok(format!(
            "{}{}",
            link("pkg-headers_1.0_amd64.deb"),
            link("pkg-common_1.0_amd64.deb")
        ))
    });
    fetcher
        .expect_probe()
        .with(eq("http://a.test/pool/pkg-common_1.0_amd64.deb"))
        .returning(|url| Err(FetchError::NotFound { url: url.to_owned() }));
    fetcher.expect_probe().returning(|_| Ok(()));

    let mut headers = search(ArtifactRole::Headers, &[MIRROR_A]);
    headers.matcher = PackageIndexMatcher::new(vec![
        NamingScheme::new("headers", r#"href="(pkg-headers_[^"]*\.deb)""#).expect("valid"),
    ]);
    let mut common = search(ArtifactRole::CommonHeaders, &[MIRROR_A]);
    common.matcher = PackageIndexMatcher::new(vec![
        NamingScheme::new("common", r#"href="(pkg-common_[^"]*\.deb)""#).expect("valid"),
    ]);
    let plan = ResolutionPlan {
        searches: vec![headers, common],
        min_artifacts: 2,
    };

    let err = resolve(&fetcher, &plan, None).expect_err("one URL is gone");
    assert_eq!(
        err,
        ResolutionError::InsufficientArtifacts {
            found: 1,
            required: 2
        }
    );
}

#[rstest]
#[case::below_minimum(2, 3, false)]
#[case::at_minimum(3, 3, true)]
#[case::above_minimum(4, 3, true)]
fn override_urls_are_held_to_the_minimum(
    #[case] supplied: usize,
    #[case] required: usize,
    #[case] accepted: bool,
) {
    let mut fetcher = MockIndexFetcher::new();
    fetcher.expect_fetch_index().times(0);
    fetcher.expect_probe().times(supplied).returning(|_| Ok(()));

    let overrides: Vec<String> = (0..supplied)
        .map(|i| format!("https://override.test/pkg-{i}.deb"))
        .collect();
    let plan = ResolutionPlan {
        searches: vec![search(ArtifactRole::Headers, &[MIRROR_A])],
        min_artifacts: required,
    };

    let result = resolve(&fetcher, &plan, Some(&overrides));
    if accepted {
        let set = result.expect("enough overrides");
        assert_eq!(set.len(), supplied);
        assert!(
            set.artifacts()
                .iter()
                .all(|a| a.role == ArtifactRole::Override)
        );
    } else {
        assert_eq!(
            result.expect_err("too few overrides"),
            ResolutionError::InsufficientArtifacts {
                found: supplied,
                required
            }
        );
    }
}

#[test]
fn unreachable_overrides_are_dropped_before_counting() {
    let mut fetcher = MockIndexFetcher::new();
    fetcher
        .expect_probe()
        .with(eq("https://override.test/gone.deb"))
        .returning(|url| Err(refused(url)));
    fetcher.expect_probe().returning(|_| Ok(()));

    let overrides = vec![
        "https://override.test/a.deb".to_owned(),
        "https://override.test/gone.deb".to_owned(),
    ];
    let plan = ResolutionPlan {
        searches: Vec::new(),
        min_artifacts: 1,
    };

    let set = resolve(&fetcher, &plan, Some(&overrides)).expect("one override survives");
    assert_eq!(set.urls(), vec!["https://override.test/a.deb"]);
}

#[rstest]
#[case("http://a.test/pool/", "x.deb", "http://a.test/pool/x.deb")]
#[case("http://a.test/pool", "x.deb", "http://a.test/pool/x.deb")]
#[case("http://a.test/pool//", "/x.deb", "http://a.test/pool/x.deb")]
fn join_url_uses_a_single_separator(
    #[case] base: &str,
    #[case] filename: &str,
    #[case] expected: &str,
) {
    assert_eq!(join_url(base, filename), expected);
}
