use braidnote_core::{
    BranchStore, ContentKind, FetchError, Note, NoteCache, NoteId, NoteSelection, NoteSource,
    ReferenceResolver, RelocationEngine,
};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct StaticSource {
    notes: HashMap<NoteId, Note>,
}

impl NoteSource for StaticSource {
    fn fetch_note(&self, note_id: NoteId) -> LocalBoxFuture<'_, Result<Option<Note>, FetchError>> {
        let found = self.notes.get(&note_id).cloned();
        async move { Ok(found) }.boxed_local()
    }
}

struct Fixture {
    store: Rc<RefCell<BranchStore>>,
    cache: Rc<NoteCache>,
    resolver: ReferenceResolver,
}

fn fixture(notes: &[(&str, &str)]) -> Fixture {
    let mut store = BranchStore::new();
    let mut records = HashMap::new();
    for (id, title) in notes {
        let note_id = NoteId::new(*id);
        store.register_note(note_id.clone());
        records.insert(
            note_id.clone(),
            Note::new(note_id, *title, ContentKind::Text),
        );
    }
    let store = Rc::new(RefCell::new(store));
    let cache = Rc::new(NoteCache::new(Rc::new(StaticSource { notes: records })));
    let resolver = ReferenceResolver::new(Rc::clone(&store), Rc::clone(&cache));
    Fixture {
        store,
        cache,
        resolver,
    }
}

fn attach(fx: &Fixture, note: &str, parent: &str) {
    fx.store
        .borrow_mut()
        .create_branch(NoteId::new(note), NoteId::new(parent), None, None)
        .unwrap();
}

#[tokio::test]
async fn query_matches_titles_case_insensitively() {
    let fx = fixture(&[
        ("n1", "Monthly planning"),
        ("n2", "Planning backlog"),
        ("n3", "Grocery list"),
    ]);
    attach(&fx, "n1", "root");
    attach(&fx, "n2", "root");
    attach(&fx, "n3", "root");

    let hits = fx.resolver.query("PLAN").await.unwrap();
    let titles: Vec<&str> = hits.iter().map(|hit| hit.title.as_str()).collect();
    // "Planning backlog" matches at offset 0 and sorts first.
    assert_eq!(titles, vec!["Planning backlog", "Monthly planning"]);
}

#[tokio::test]
async fn no_match_is_an_empty_list_not_a_placeholder() {
    let fx = fixture(&[("n1", "Monthly planning")]);
    attach(&fx, "n1", "root");

    let hits = fx.resolver.query("nonexistent").await.unwrap();
    assert!(hits.is_empty());

    let feed = fx.resolver.mention_feed("nonexistent", '@').await.unwrap();
    assert!(feed.is_empty());
}

#[tokio::test]
async fn orphans_never_surface_in_results() {
    let fx = fixture(&[("n1", "Visible note"), ("n2", "Orphan note")]);
    attach(&fx, "n1", "root");
    // n2 is registered but has no branch.

    let hits = fx.resolver.query("note").await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|hit| hit.note_id.as_str()).collect();
    assert_eq!(ids, vec!["n1"]);
}

#[tokio::test]
async fn mention_feed_shapes_marker_token_and_path_link() {
    let fx = fixture(&[("folder", "Projects"), ("n1", "Roadmap")]);
    attach(&fx, "folder", "root");
    attach(&fx, "n1", "folder");

    let feed = fx.resolver.mention_feed("road", '@').await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, "@Roadmap");
    assert_eq!(feed[0].text, "Roadmap");
    assert_eq!(feed[0].link, "#root/folder/n1");

    let wire = serde_json::to_value(&feed[0]).unwrap();
    assert_eq!(wire["id"], "@Roadmap");
    assert_eq!(wire["link"], "#root/folder/n1");
}

#[tokio::test]
async fn empty_query_suggests_recent_notes_newest_first() {
    let fx = fixture(&[("n1", "First"), ("n2", "Second")]);
    attach(&fx, "n1", "root");
    attach(&fx, "n2", "root");

    assert!(fx.resolver.query("").await.unwrap().is_empty());

    fx.resolver.record_visit(&NoteId::new("n1"));
    fx.resolver.record_visit(&NoteId::new("n2"));

    let hits = fx.resolver.query("  ").await.unwrap();
    let titles: Vec<&str> = hits.iter().map(|hit| hit.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First"]);
}

#[tokio::test]
async fn results_reflect_relocation_immediately() {
    let fx = fixture(&[("a", "Alpha"), ("b", "Beta"), ("n1", "Roadmap")]);
    attach(&fx, "a", "root");
    attach(&fx, "b", "root");
    attach(&fx, "n1", "a");

    let before = fx.resolver.mention_feed("roadmap", '@').await.unwrap();
    assert_eq!(before[0].link, "#root/a/n1");

    let engine = RelocationEngine::new(Rc::clone(&fx.store), Rc::clone(&fx.cache));
    let branch = fx
        .store
        .borrow()
        .branch_between(&NoteId::new("a"), &NoteId::new("n1"))
        .unwrap()
        .branch_id
        .clone();
    engine
        .relocate(
            &[NoteSelection::moving(NoteId::new("n1"), branch)],
            "root/b",
        )
        .await
        .unwrap();

    let after = fx.resolver.mention_feed("roadmap", '@').await.unwrap();
    assert_eq!(after[0].link, "#root/b/n1");
}
