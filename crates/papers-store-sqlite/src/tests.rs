//! Integration tests for `SqliteStore` against in-memory databases.

use papers_core::{
  lookup::{DeletePolicy, LookupKind, NewLookup},
  naming::NamingScheme,
  paper::{Field, NewPaper, PaperFields, PaperId, PaperPatch},
  store::{PaperStore, SearchBackend, SearchQuery},
};

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  store_with(StoreOptions::default()).await
}

async fn store_with(options: StoreOptions) -> SqliteStore {
  SqliteStore::open_in_memory(options)
    .await
    .expect("in-memory store")
}

fn scheme(naming: NamingScheme) -> StoreOptions {
  StoreOptions { naming, ..Default::default() }
}

fn substring() -> StoreOptions {
  StoreOptions { full_text: false, ..Default::default() }
}

fn paper(title: &str, authors: &str, year: i32, journal: &str, doi: &str) -> NewPaper {
  NewPaper {
    fields: PaperFields {
      title: title.into(),
      authors: authors.into(),
      year: Some(year),
      journal: journal.into(),
      doi: doi.into(),
      ..Default::default()
    },
    ..Default::default()
  }
}

fn filed(title: &str, year: i32, category: &str, project: &str) -> NewPaper {
  let mut p = paper(title, "Doe", year, "Cell", "1");
  p.fields.category = Some(category.into());
  p.fields.project = Some(project.into());
  p
}

// ─── Papers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_hierarchical_name() {
  let s = store().await;
  let created = s
    .create(paper("Probabilistic Reasoning Networks", "Smith", 2023, "Nature", "12345"))
    .await
    .unwrap();
  assert_eq!(created.unique_name, "2023-PRKS-SMITH-NATURE-12345");
  assert_eq!(created.created_at, created.updated_at);

  let fetched = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn incomplete_record_gets_empty_name() {
  let s = store().await;
  let created = s.create(paper("Untitled Draft", "Smith", 2023, "Nature", "")).await.unwrap();
  assert_eq!(created.unique_name, "");
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(PaperId(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn update_renames_only_on_constituent_change() {
  let s = store().await;
  let created = s.create(paper("Deep Learning", "LeCun", 2015, "Nature", "521")).await.unwrap();
  assert_eq!(created.unique_name, "2015-DENG-LECUN-NATURE-521");

  let patch = PaperPatch::new().set(Field::Notes, "landmark review").unwrap();
  let noted = s.update(created.id, patch).await.unwrap();
  assert_eq!(noted.fields.notes, "landmark review");
  assert_eq!(noted.unique_name, created.unique_name);
  assert!(noted.updated_at >= created.updated_at);
  assert_eq!(noted.created_at, created.created_at);

  let patch = PaperPatch::new().set(Field::Doi, "10.1038/nature14539").unwrap();
  let moved = s.update(created.id, patch).await.unwrap();
  assert_eq!(moved.unique_name, "2015-DENG-LECUN-NATURE-10_1038_NATURE14539");
  assert_eq!(s.get(created.id).await.unwrap().unwrap(), moved);
}

#[tokio::test]
async fn update_missing_paper_errors() {
  let s = store().await;
  let patch = PaperPatch::new().set(Field::Title, "Ghost").unwrap();
  let err = s.update(PaperId(7), patch).await.unwrap_err();
  assert!(matches!(err, Error::PaperNotFound(PaperId(7))));
}

#[tokio::test]
async fn extension_fields_are_stored_and_removed() {
  let s = store().await;
  let mut input = paper("Cell Atlas", "Regev", 2017, "eLife", "6");
  input.extras.insert("reviewer".into(), "Ada".into());
  input.extras.insert("blank".into(), "  ".into());
  let created = s.create(input).await.unwrap();
  assert_eq!(created.extras.len(), 1);

  let fetched = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.extras.get("reviewer").map(String::as_str), Some("Ada"));

  let patch = PaperPatch::new().set_extra("reviewer", "").set_extra("round", "2");
  let updated = s.update(created.id, patch).await.unwrap();
  assert!(!updated.extras.contains_key("reviewer"));
  assert_eq!(updated.extras.get("round").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn created_extras_match_what_is_stored() {
  let s = store().await;
  let mut input = paper("Cell Atlas", "Regev", 2017, "eLife", "6");
  input.extras.insert("reviewer".into(), "  Ada Lovelace ".into());
  let created = s.create(input).await.unwrap();
  assert_eq!(created.extras.get("reviewer").map(String::as_str), Some("Ada Lovelace"));
  assert_eq!(s.get(created.id).await.unwrap().unwrap(), created);
}

#[tokio::test]
async fn delete_removes_every_listed_paper() {
  let s = store().await;
  let a = s.create(paper("Alpha Study", "A", 2001, "J", "1")).await.unwrap();
  let b = s.create(paper("Beta Study", "B", 2002, "J", "2")).await.unwrap();
  let c = s.create(paper("Gamma Study", "C", 2003, "J", "3")).await.unwrap();

  assert_eq!(s.delete(&[a.id, c.id, a.id]).await.unwrap(), 2);
  assert_eq!(s.count().await.unwrap(), 1);
  assert!(s.get(b.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_with_unknown_id_changes_nothing() {
  let s = store().await;
  let a = s.create(paper("Alpha Study", "A", 2001, "J", "1")).await.unwrap();
  let b = s.create(paper("Beta Study", "B", 2002, "J", "2")).await.unwrap();

  let err = s.delete(&[a.id, PaperId(999), b.id]).await.unwrap_err();
  assert!(matches!(err, Error::PaperNotFound(PaperId(999))));
  assert_eq!(s.count().await.unwrap(), 2);
  assert!(s.get(a.id).await.unwrap().is_some());
}

#[tokio::test]
async fn import_inserts_in_order() {
  let s = store().await;
  let batch = vec![
    paper("First Paper", "A", 2001, "J", "1"),
    paper("Second Paper", "B", 2002, "J", "2"),
    paper("Third Paper", "C", 2003, "J", "3"),
  ];
  let ids = s.import(batch).await.unwrap();
  assert_eq!(ids.len(), 3);
  assert!(ids.windows(2).all(|w| w[0] < w[1]));
  assert_eq!(s.count().await.unwrap(), 3);
  let second = s.get(ids[1]).await.unwrap().unwrap();
  assert_eq!(second.fields.title, "Second Paper");
}

#[tokio::test]
async fn failed_import_leaves_no_trace() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("papers.db");
  let s = SqliteStore::open(&path, scheme(NamingScheme::Sequential)).await.unwrap();
  let first = s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();
  assert_eq!(first.unique_name, "0001-HEES-BRNG-SYEL");

  let raw = rusqlite::Connection::open(&path).unwrap();
  raw
    .execute_batch(
      "CREATE TRIGGER reject_boom BEFORE INSERT ON papers WHEN NEW.title = 'BOOM'
       BEGIN SELECT RAISE(ABORT, 'boom'); END;",
    )
    .unwrap();
  drop(raw);

  let batch = vec![
    filed("Liver Organoids", 2021, "BRNG", "SYEL"),
    filed("BOOM", 2021, "BRNG", "SYEL"),
    filed("Bone Scaffolds", 2022, "BRNG", "SYEL"),
  ];
  assert!(s.import(batch).await.is_err());
  assert_eq!(s.count().await.unwrap(), 1);
  assert!(s.search(&SearchQuery::text("organoids")).await.unwrap().is_empty());

  // Neither ids nor sequence numbers from the rolled-back rows are used up.
  let next = s.create(filed("Skin Grafts", 2022, "BRNG", "SYEL")).await.unwrap();
  assert_eq!(next.id, PaperId(first.id.0 + 1));
  assert_eq!(next.unique_name, "0002-SKTS-BRNG-SYEL");
}

#[tokio::test]
async fn distinct_values_skip_blanks() {
  let s = store().await;
  s.create(paper("One", "A", 2020, "Nature", "1")).await.unwrap();
  s.create(paper("Two", "B", 2019, "Cell", "2")).await.unwrap();
  s.create(paper("Three", "C", 2020, "", "3")).await.unwrap();

  assert_eq!(s.distinct_values(Field::Journal).await.unwrap(), vec!["Cell", "Nature"]);
  assert_eq!(s.distinct_values(Field::Year).await.unwrap(), vec!["2019", "2020"]);
  assert!(s.distinct_values(Field::Category).await.unwrap().is_empty());
}

// ─── Search ──────────────────────────────────────────────────────────────────

async fn seeded(options: StoreOptions) -> SqliteStore {
  let s = store_with(options).await;
  s.create(paper("Neural Networks for Vision", "Smith", 2020, "Nature", "1")).await.unwrap();
  let mut graph = paper("Graph Theory Basics", "Jones", 2021, "Science", "2");
  graph.fields.r#abstract = "A survey touching on neural methods.".into();
  s.create(graph).await.unwrap();
  let mut soil = paper("Soil Chemistry", "Brown", 2020, "Nature", "3");
  soil.fields.status = "Read".into();
  s.create(soil).await.unwrap();
  s
}

#[tokio::test]
async fn bundled_sqlite_uses_full_text() {
  let s = store().await;
  assert_eq!(s.search_backend(), SearchBackend::FullText);
  assert_eq!(store_with(substring()).await.search_backend(), SearchBackend::Substring);
}

#[tokio::test]
async fn text_search_matches_on_both_backends() {
  for options in [StoreOptions::default(), substring()] {
    let s = seeded(options).await;
    let hits = s.search(&SearchQuery::text("neural")).await.unwrap();
    let mut titles: Vec<_> = hits.iter().map(|p| p.fields.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, ["Graph Theory Basics", "Neural Networks for Vision"]);

    let hits = s.search(&SearchQuery::text("Networks FOR")).await.unwrap();
    assert_eq!(hits.len(), 1, "{:?}", s.search_backend());
  }
}

#[tokio::test]
async fn accented_text_folds_case_on_both_backends() {
  for options in [StoreOptions::default(), substring()] {
    let s = seeded(options).await;
    s.create(paper("Élan Vital in Ökologie", "Müller", 2019, "Oikos", "7")).await.unwrap();
    for needle in ["élan", "ÖKOLOGIE"] {
      let hits = s.search(&SearchQuery::text(needle)).await.unwrap();
      assert_eq!(hits.len(), 1, "{needle} on {:?}", s.search_backend());
      assert_eq!(hits[0].fields.title, "Élan Vital in Ökologie");
    }
  }
}

#[tokio::test]
async fn filters_combine_with_text() {
  for options in [StoreOptions::default(), substring()] {
    let s = seeded(options).await;
    let query = SearchQuery { year: Some(2020), ..SearchQuery::text("neural") };
    let hits = s.search(&query).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fields.year, Some(2020));

    let query = SearchQuery { journal: Some("nature".into()), ..Default::default() };
    assert_eq!(s.search(&query).await.unwrap().len(), 2);

    let query = SearchQuery { status: Some("READ".into()), ..Default::default() };
    let hits = s.search(&query).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fields.title, "Soil Chemistry");
  }
}

#[tokio::test]
async fn empty_query_lists_by_id_with_limit() {
  let s = seeded(StoreOptions::default()).await;
  let all = s.search(&SearchQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  assert!(all.windows(2).all(|w| w[0].id < w[1].id));

  let blank = SearchQuery { limit: 2, ..SearchQuery::text("   ") };
  let limited = s.search(&blank).await.unwrap();
  assert_eq!(limited.len(), 2);
  assert_eq!(limited[0].id, all[0].id);
}

#[tokio::test]
async fn query_syntax_is_treated_as_text() {
  for options in [StoreOptions::default(), substring()] {
    let s = seeded(options).await;
    for raw in ["\"unbalanced", "NOT AND OR", "50%", "a_b*"] {
      assert!(s.search(&SearchQuery::text(raw)).await.unwrap().is_empty(), "{raw}");
    }
  }
}

#[tokio::test]
async fn index_follows_updates_and_deletes() {
  let s = seeded(StoreOptions::default()).await;
  let first = PaperId(1);
  let patch = PaperPatch::new().set(Field::Title, "Symbolic Methods for Vision").unwrap();
  s.update(first, patch).await.unwrap();

  let hits = s.search(&SearchQuery::text("neural")).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].fields.title, "Graph Theory Basics");
  assert_eq!(s.search(&SearchQuery::text("symbolic")).await.unwrap().len(), 1);

  s.delete(&[PaperId(2)]).await.unwrap();
  assert!(s.search(&SearchQuery::text("neural")).await.unwrap().is_empty());

  let report = s.validate().await.unwrap();
  assert_eq!(report.index_mismatch, None);
  s.rebuild_search_index().await.unwrap();
  assert_eq!(s.search(&SearchQuery::text("symbolic")).await.unwrap().len(), 1);
}

// ─── Unique-name counters ────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_counter_continues_past_highest() {
  let s = store_with(scheme(NamingScheme::Sequential)).await;
  let a = s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();
  let b = s.create(filed("Liver Organoids", 2021, "BRNG", "SYEL")).await.unwrap();
  let c = s.create(filed("Bone Scaffolds", 2022, "BRNG", "FE35")).await.unwrap();
  assert_eq!(a.unique_name, "0001-HEES-BRNG-SYEL");
  assert_eq!(b.unique_name, "0002-LIDS-BRNG-SYEL");
  assert_eq!(c.unique_name, "0003-BODS-BRNG-FE35");

  s.delete(&[b.id]).await.unwrap();
  let d = s.create(filed("Skin Grafts", 2022, "BRNG", "SYEL")).await.unwrap();
  assert_eq!(d.unique_name, "0004-SKTS-BRNG-SYEL");
}

#[tokio::test]
async fn year_based_counters_are_per_year() {
  let s = store_with(scheme(NamingScheme::YearBased)).await;
  let a = s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();
  let b = s.create(filed("Liver Organoids", 2021, "BRNG", "SYEL")).await.unwrap();
  let c = s.create(filed("Bone Scaffolds", 2020, "BRNG", "SYEL")).await.unwrap();
  assert_eq!(a.unique_name, "2020-001-HEES-BRNG-SYEL");
  assert_eq!(b.unique_name, "2021-001-LIDS-BRNG-SYEL");
  assert_eq!(c.unique_name, "2020-002-BODS-BRNG-SYEL");

  // Same partition keeps the number; a new partition takes its next one.
  let retitled = s
    .update(c.id, PaperPatch::new().set(Field::Title, "Bone Implants").unwrap())
    .await
    .unwrap();
  assert_eq!(retitled.unique_name, "2020-002-BOTS-BRNG-SYEL");
  let moved = s
    .update(a.id, PaperPatch::new().set(Field::Year, "2021").unwrap())
    .await
    .unwrap();
  assert_eq!(moved.unique_name, "2021-002-HEES-BRNG-SYEL");
}

#[tokio::test]
async fn import_counts_on_within_each_partition() {
  let s = store_with(scheme(NamingScheme::YearBased)).await;
  s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();

  let ids = s
    .import(vec![
      filed("Liver Organoids", 2021, "BRNG", "SYEL"),
      filed("Bone Scaffolds", 2020, "BRNG", "SYEL"),
      paper("Unfiled Note", "Doe", 2020, "Cell", "1"),
      filed("Skin Grafts", 2021, "BRNG", "SYEL"),
      filed("Bone Implants", 2020, "BRNG", "SYEL"),
    ])
    .await
    .unwrap();

  let mut names = Vec::new();
  for id in ids {
    names.push(s.get(id).await.unwrap().unwrap().unique_name);
  }
  assert_eq!(names, [
    "2021-001-LIDS-BRNG-SYEL",
    "2020-002-BODS-BRNG-SYEL",
    "",
    "2021-002-SKTS-BRNG-SYEL",
    "2020-003-BOTS-BRNG-SYEL",
  ]);

  let after = s.create(filed("Heart Valves", 2021, "BRNG", "SYEL")).await.unwrap();
  assert_eq!(after.unique_name, "2021-003-HEES-BRNG-SYEL");
}

#[tokio::test]
async fn project_counters_are_per_project() {
  let s = store_with(scheme(NamingScheme::Simple)).await;
  let a = s.create(filed("One", 2020, "BRNG", "SYEL")).await.unwrap();
  let b = s.create(filed("Two", 2020, "BRNG", "FE35")).await.unwrap();
  let c = s.create(filed("Three", 2020, "AGLS", "SYEL")).await.unwrap();
  assert_eq!(a.unique_name, "BRNG-SYEL-001");
  assert_eq!(b.unique_name, "BRNG-FE35-001");
  assert_eq!(c.unique_name, "AGLS-SYEL-002");
}

#[tokio::test]
async fn regenerate_previews_then_applies() {
  let s = store().await;
  s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();
  s.create(paper("No Lookups", "Doe", 2020, "Cell", "9")).await.unwrap();
  s.create(filed("Liver Organoids", 2021, "BRNG", "SYEL")).await.unwrap();

  let plan = s.regenerate_names(NamingScheme::Sequential, false).await.unwrap();
  let planned: Vec<_> = plan.iter().map(|c| c.new_name.as_str()).collect();
  assert_eq!(planned, ["0001-HEES-BRNG-SYEL", "", "0002-LIDS-BRNG-SYEL"]);
  assert!(!plan[1].is_change());
  let untouched = s.get(PaperId(1)).await.unwrap().unwrap();
  assert_eq!(untouched.unique_name, "2020-HEES-DOE-CELL-1");

  s.regenerate_names(NamingScheme::Sequential, true).await.unwrap();
  assert_eq!(s.get(PaperId(1)).await.unwrap().unwrap().unique_name, "0001-HEES-BRNG-SYEL");
  assert_eq!(s.get(PaperId(2)).await.unwrap().unwrap().unique_name, "2020-NOPS-DOE-CELL-9");
  assert_eq!(s.get(PaperId(3)).await.unwrap().unwrap().unique_name, "0002-LIDS-BRNG-SYEL");
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn validate_reports_each_problem() {
  let s = store().await;
  assert!(s.validate().await.unwrap().is_clean());

  let twin = paper("Twin Study", "Roe", 2010, "Lancet", "7");
  let a = s.create(twin.clone()).await.unwrap();
  let b = s.create(twin).await.unwrap();
  let blank = s.create(paper("Draft", "Roe", 2010, "", "")).await.unwrap();
  let mut stray = paper("Stray Codes", "Roe", 2011, "Lancet", "8");
  stray.fields.category = Some("ZZZZ".into());
  let stray = s.create(stray).await.unwrap();

  let report = s.validate().await.unwrap();
  assert_eq!(report.empty_unique_names, vec![blank.id]);
  assert_eq!(
    report.duplicate_unique_names.get("2010-TWDY-ROE-LANCET-7"),
    Some(&vec![a.id, b.id])
  );
  assert_eq!(report.dangling_references, vec![(stray.id, LookupKind::Category, "ZZZZ".into())]);
  assert!(report.nonconforming_names.is_empty());
  assert_eq!(report.issues().len(), 3);

  let misc = NewLookup { code: Some("ZZZZ".into()), ..NewLookup::new("Misc") };
  s.add_lookup(LookupKind::Category, misc).await.unwrap();
  assert!(s.validate().await.unwrap().dangling_references.is_empty());
}

#[tokio::test]
async fn validate_flags_names_from_another_scheme() {
  let s = store().await;
  s.create(filed("Heart Valves", 2020, "BRNG", "SYEL")).await.unwrap();
  s.regenerate_names(NamingScheme::Simple, true).await.unwrap();
  let report = s.validate().await.unwrap();
  assert_eq!(report.nonconforming_names, vec![PaperId(1)]);
}

#[tokio::test]
async fn stats_summarise_years() {
  let s = seeded(StoreOptions::default()).await;
  let stats = s.stats().await.unwrap();
  assert_eq!(stats.total_records, 3);
  assert_eq!(stats.by_year, vec![(2021, 1), (2020, 2)]);
  assert_eq!(stats.recent_additions, 3);
  assert_eq!(stats.backend, SearchBackend::FullText);
}

#[tokio::test]
async fn reopening_a_file_keeps_data() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("papers.db");
  {
    let s = SqliteStore::open(&path, StoreOptions::default()).await.unwrap();
    s.create(paper("Neural Persistence", "Kim", 2019, "PNAS", "4")).await.unwrap();
  }
  let s = SqliteStore::open(&path, substring()).await.unwrap();
  assert_eq!(s.count().await.unwrap(), 1);
  assert_eq!(s.search_backend(), SearchBackend::Substring);
  assert_eq!(s.search(&SearchQuery::text("persistence")).await.unwrap().len(), 1);

  // The index created on first open is still maintained by its triggers.
  s.create(paper("Neural Drift", "Kim", 2020, "PNAS", "5")).await.unwrap();
  assert_eq!(s.validate().await.unwrap().index_mismatch, None);
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_codes_are_derived_and_disambiguated() {
  let s = store().await;
  let first = s.add_lookup(LookupKind::Category, NewLookup::new("Cardiac Bioprinting")).await.unwrap();
  let second = s.add_lookup(LookupKind::Category, NewLookup::new("Cardiac Tissue Engineering")).await.unwrap();
  assert_eq!(first.code, "CANG");
  assert_eq!(second.code, "CAN2");

  let explicit = NewLookup { code: Some("syel".into()), ..NewLookup::new("Synthetic Elastin") };
  let project = s.add_lookup(LookupKind::Project, explicit).await.unwrap();
  assert_eq!(project.code, "SYEL");

  let names: Vec<_> = s
    .list_lookups(LookupKind::Category)
    .await
    .unwrap()
    .into_iter()
    .map(|l| l.name)
    .collect();
  assert_eq!(names, ["Cardiac Bioprinting", "Cardiac Tissue Engineering"]);
  assert!(s.list_lookups(LookupKind::Project).await.unwrap().len() == 1);
}

#[tokio::test]
async fn seeding_skips_existing_codes_and_names() {
  let s = store().await;
  s.add_lookup(LookupKind::Category, NewLookup::new("phd")).await.unwrap();
  let mine = NewLookup { code: Some("BRNG".into()), ..NewLookup::new("Brain Mapping") };
  s.add_lookup(LookupKind::Category, mine).await.unwrap();

  assert_eq!(s.seed_lookups(LookupKind::Category).await.unwrap(), 2);
  let codes: Vec<_> = s
    .list_lookups(LookupKind::Category)
    .await
    .unwrap()
    .into_iter()
    .map(|l| (l.code, l.name))
    .collect();
  assert_eq!(codes, [
    ("BRNG".to_owned(), "Brain Mapping".to_owned()),
    ("FE35".to_owned(), "Fellowship i3S".to_owned()),
    ("OTER".to_owned(), "Other".to_owned()),
    ("PHHD".to_owned(), "phd".to_owned()),
  ]);

  assert_eq!(s.seed_lookups(LookupKind::Project).await.unwrap(), 10);
  assert_eq!(s.seed_lookups(LookupKind::Project).await.unwrap(), 0);
}

#[tokio::test]
async fn lookup_conflicts_are_rejected() {
  let s = store().await;
  s.add_lookup(LookupKind::Project, NewLookup::new("Synthetic Elastin")).await.unwrap();

  let err = s.add_lookup(LookupKind::Project, NewLookup::new("synthetic elastin")).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateLookupName { .. }));

  let taken = NewLookup { code: Some("SYIN".into()), ..NewLookup::new("Other") };
  let err = s.add_lookup(LookupKind::Project, taken).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateLookupCode { code, .. } if code == "SYIN"));

  let err = s.add_lookup(LookupKind::Project, NewLookup::new("  ")).await.unwrap_err();
  assert!(matches!(err, Error::Core(papers_core::Error::EmptyLookupName)));

  // Same name is fine under the other kind.
  s.add_lookup(LookupKind::Category, NewLookup::new("Synthetic Elastin")).await.unwrap();
}

#[tokio::test]
async fn lookups_can_be_renamed() {
  let s = store().await;
  s.add_lookup(LookupKind::Category, NewLookup::new("Biology")).await.unwrap();
  let updated = s
    .update_lookup(LookupKind::Category, "bigy".into(), "Molecular Biology".into(), "wet lab".into())
    .await
    .unwrap();
  assert_eq!(updated.code, "BIGY");
  assert_eq!(updated.name, "Molecular Biology");
  assert_eq!(updated.description, "wet lab");

  let err = s
    .update_lookup(LookupKind::Category, "NONE".into(), "X".into(), String::new())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::LookupNotFound { .. }));
}

#[tokio::test]
async fn restrict_policy_blocks_delete_in_use() {
  let s = store().await;
  s.add_lookup(LookupKind::Category, NewLookup::new("Biology")).await.unwrap();
  s.create(filed("Heart Valves", 2020, "BIGY", "SYEL")).await.unwrap();

  let err = s.delete_lookup(LookupKind::Category, "BIGY".into()).await.unwrap_err();
  assert!(matches!(err, Error::LookupInUse { papers: 1, .. }));
  assert_eq!(s.list_lookups(LookupKind::Category).await.unwrap().len(), 1);

  let err = s.delete_lookup(LookupKind::Category, "GONE".into()).await.unwrap_err();
  assert!(matches!(err, Error::LookupNotFound { .. }));
}

#[tokio::test]
async fn clear_policy_nulls_references_and_renames() {
  let options = StoreOptions {
    naming: NamingScheme::Simple,
    delete_policy: DeletePolicy::ClearReferences,
    ..Default::default()
  };
  let s = store_with(options).await;
  s.add_lookup(LookupKind::Category, NewLookup::new("Biology")).await.unwrap();
  let a = s.create(filed("Heart Valves", 2020, "BIGY", "SYEL")).await.unwrap();
  let b = s.create(filed("Liver Organoids", 2020, "AGLS", "SYEL")).await.unwrap();
  assert_eq!(a.unique_name, "BIGY-SYEL-001");

  assert_eq!(s.delete_lookup(LookupKind::Category, "bigy".into()).await.unwrap(), 1);
  assert!(s.list_lookups(LookupKind::Category).await.unwrap().is_empty());

  let a = s.get(a.id).await.unwrap().unwrap();
  assert_eq!(a.fields.category, None);
  assert_eq!(a.unique_name, "");
  assert_eq!(s.get(b.id).await.unwrap().unwrap().unique_name, "AGLS-SYEL-002");
}
