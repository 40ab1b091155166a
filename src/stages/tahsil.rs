use crate::config::BaseUrl;
use crate::error::Result;
use crate::models::{District, Tahsil, TahsilRow};
use crate::schema::{self, ExtractionSchema};
use crate::store::{load_records, DISTRICTS_FILE, TAHSILS_FILE};

use super::{Stage, StageContext};

/// `districts.json` → one page per district → `tahsil.json`.
pub struct TahsilStage;

impl Stage for TahsilStage {
    type Parent = District;
    type Row = TahsilRow;
    type Output = Tahsil;

    const NAME: &'static str = "tahsils";
    const OUTPUT_FILE: &'static str = TAHSILS_FILE;

    fn schema() -> ExtractionSchema {
        schema::tahsils()
    }

    fn load_parents(ctx: &StageContext<'_>) -> Result<Vec<District>> {
        load_records(&ctx.data.path(DISTRICTS_FILE))
    }

    fn page_url(base: &BaseUrl, district: &District) -> String {
        base.join(&district.district_url)
    }

    fn parent_name(district: &District) -> &str {
        &district.district_name
    }

    fn adopt(district: &District, row: TahsilRow) -> Option<Tahsil> {
        if row.tahsil_url.trim().is_empty() {
            return None;
        }
        Some(Tahsil::from_row(row, district))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::crawler::testing::{listing, MockFetcher};
    use crate::error::CrawlError;
    use crate::stages::tests::{context, BASE};
    use crate::stages::{failures_file, run, FailurePolicy};
    use crate::store::save_records;

    fn district(name: &str, url: &str) -> District {
        District {
            district_name: name.into(),
            district_url: url.into(),
            census_code: "1".into(),
            number_of_villages: "5".into(),
        }
    }

    #[tokio::test]
    async fn stamps_district_name_on_each_tahsil() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DISTRICTS_FILE),
            r#"[{"district_name":"A","district_url":"/a","census_code":"1","number_of_villages":"5"}]"#,
        )
        .unwrap();
        let fetcher =
            MockFetcher::new().with_page(&format!("{}/a", BASE), &listing(&[("T1", "/a/t1", "")]));

        run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap();

        let raw = fs::read_to_string(dir.path().join(TAHSILS_FILE)).unwrap();
        let written: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            written,
            json!([{"tahsil_name": "T1", "tahsil_url": "/a/t1", "district_name": "A"}])
        );
    }

    #[tokio::test]
    async fn one_record_per_row_across_districts() {
        let dir = tempfile::tempdir().unwrap();
        save_records(
            &dir.path().join(DISTRICTS_FILE),
            &[district("Ahmednagar", "/mh/ahmednagar"), district("Akola", "/mh/akola")],
        )
        .unwrap();
        let fetcher = MockFetcher::new()
            .with_page(
                &format!("{}/mh/ahmednagar", BASE),
                &fs::read_to_string("tests/fixtures/tahsils.html").unwrap(),
            )
            .with_page(
                &format!("{}/mh/akola", BASE),
                &listing(&[("Akot", "/mh/akola/akot", "")]),
            );

        let report = run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap();
        assert_eq!(report.records, 4);

        let tahsils: Vec<Tahsil> = load_records(&dir.path().join(TAHSILS_FILE)).unwrap();
        let owners: Vec<(&str, &str)> = tahsils
            .iter()
            .map(|t| (t.tahsil_name.as_str(), t.district_name.as_str()))
            .collect();
        assert_eq!(
            owners,
            [
                ("Akole", "Ahmednagar"),
                ("Sangamner", "Ahmednagar"),
                ("Kopargaon", "Ahmednagar"),
                ("Akot", "Akola"),
            ]
        );
    }

    #[tokio::test]
    async fn failure_mid_stage_leaves_previous_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(TAHSILS_FILE);
        fs::write(&out, "[]").unwrap();
        save_records(
            &dir.path().join(DISTRICTS_FILE),
            &[district("A", "/a"), district("B", "/b"), district("C", "/c")],
        )
        .unwrap();
        let fetcher = MockFetcher::new()
            .with_page(&format!("{}/a", BASE), &listing(&[("T1", "/a/t1", "")]))
            .with_failure(&format!("{}/b", BASE), "connection reset")
            .with_page(&format!("{}/c", BASE), &listing(&[("T3", "/c/t3", "")]));

        let err = run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap_err();
        assert!(matches!(err, CrawlError::FetchFailure { ref url, .. } if url.ends_with("/b")));
        // the third district is never requested
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "[]");
        assert!(!dir.path().join(failures_file("tahsils")).exists());
    }

    #[tokio::test]
    async fn empty_districts_give_empty_tahsils() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DISTRICTS_FILE), "[]").unwrap();
        let fetcher = MockFetcher::new();

        let report = run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap();
        assert_eq!(report.records, 0);
        assert!(fetcher.calls().is_empty());
        assert_eq!(fs::read_to_string(dir.path().join(TAHSILS_FILE)).unwrap(), "[]");
    }

    #[tokio::test]
    async fn missing_districts_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new();

        let err = run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap_err();
        assert!(matches!(err, CrawlError::MalformedInput { .. }));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn districts_with_foreign_keys_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DISTRICTS_FILE), r#"[{"name":"A","url":"/a"}]"#).unwrap();
        let fetcher = MockFetcher::new().with_page(BASE, &listing(&[("T1", "/t1", "")]));

        let err = run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap_err();
        assert!(matches!(err, CrawlError::MalformedInput { .. }));
        assert!(fetcher.calls().is_empty());
        assert!(!dir.path().join(TAHSILS_FILE).exists());
    }

    #[tokio::test]
    async fn stale_failure_report_is_removed_on_abort() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join(failures_file("tahsils"));
        fs::write(&report, "[]").unwrap();
        save_records(&dir.path().join(DISTRICTS_FILE), &[district("A", "/a")]).unwrap();
        let fetcher = MockFetcher::new().with_failure(&format!("{}/a", BASE), "HTTP 502");

        run::<TahsilStage>(&context(&fetcher, dir.path())).await.unwrap_err();
        assert!(!report.exists());
    }

    #[tokio::test]
    async fn skip_policy_keeps_successful_districts() {
        let dir = tempfile::tempdir().unwrap();
        save_records(
            &dir.path().join(DISTRICTS_FILE),
            &[district("A", "/a"), district("B", "/b")],
        )
        .unwrap();
        let fetcher = MockFetcher::new()
            .with_failure(&format!("{}/a", BASE), "HTTP 503")
            .with_page(&format!("{}/b", BASE), &listing(&[("T2", "/b/t2", "")]));
        let mut ctx = context(&fetcher, dir.path());
        ctx.policy = FailurePolicy::Skip;

        let report = run::<TahsilStage>(&ctx).await.unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.failures, 1);

        let tahsils: Vec<Tahsil> = load_records(&dir.path().join(TAHSILS_FILE)).unwrap();
        assert_eq!(tahsils[0].district_name, "B");

        let failures: Vec<crate::stages::FailedPage> =
            load_records(&dir.path().join(failures_file("tahsils"))).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].parent_name, "A");
        assert_eq!(failures[0].url, format!("{}/a", BASE));
    }
}
