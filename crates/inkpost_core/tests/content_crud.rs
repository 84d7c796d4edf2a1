use inkpost_core::db::open_db_in_memory;
use inkpost_core::{
    ArticleDraft, ArticlePatch, Category, CategoryDraft, ContentService, RepoError,
    SqliteArticleRepository, SqliteTaxonomyRepository, Tag, TaxonomyService,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_publish_and_read_scenario() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    assert_eq!(dev.slug, "dev");
    let go = new_tag(&mut conn, "Go");
    assert_eq!(go.slug, "go");

    let created = {
        let mut service = content(&mut conn);
        service
            .create_article(draft("Hello World", &dev, &[&go], true))
            .unwrap()
    };
    assert_eq!(created.article.slug, "hello-world");
    assert_eq!(created.article.view_count, 0);
    assert!(created.article.published_at.is_some());
    assert_eq!(created.category.post_count, 1);
    assert_eq!(created.tags.len(), 1);
    assert_eq!(created.tags[0].post_count, 1);

    let read = {
        let service = content(&mut conn);
        service.get_article("hello-world").unwrap()
    };
    assert_eq!(read.article.view_count, 1);

    let stored: i64 = conn
        .query_row(
            "SELECT view_count FROM articles WHERE slug = 'hello-world';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn create_with_two_tags_increments_each_once() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let t1 = new_tag(&mut conn, "Rust");
    let t2 = new_tag(&mut conn, "SQLite");

    {
        let mut service = content(&mut conn);
        // Duplicate ids in input must not double-count.
        let mut input = draft("Two Tags", &dev, &[&t1, &t2], true);
        input.tag_ids.push(t1.uuid);
        service.create_article(input).unwrap();
    }

    assert_eq!(tag_by_slug(&mut conn, "rust").post_count, 1);
    assert_eq!(tag_by_slug(&mut conn, "sqlite").post_count, 1);
    assert_eq!(category_by_slug(&mut conn, "dev").post_count, 1);
}

#[test]
fn clearing_tags_removes_links_and_decrements_counts() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let t1 = new_tag(&mut conn, "Rust");
    let t2 = new_tag(&mut conn, "SQLite");

    {
        let mut service = content(&mut conn);
        service
            .create_article(draft("Tagged", &dev, &[&t1, &t2], true))
            .unwrap();
        let updated = service
            .update_article(
                "tagged",
                ArticlePatch {
                    tag_ids: Some(vec![]),
                    ..ArticlePatch::default()
                },
            )
            .unwrap();
        assert!(updated.tags.is_empty());
    }

    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM article_tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
    assert_eq!(tag_by_slug(&mut conn, "rust").post_count, 0);
    assert_eq!(tag_by_slug(&mut conn, "sqlite").post_count, 0);
}

#[test]
fn partial_patch_leaves_absent_fields_unchanged() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let go = new_tag(&mut conn, "Go");

    let mut service = content(&mut conn);
    let created = service
        .create_article(draft("Stable Title", &dev, &[&go], true))
        .unwrap();

    let updated = service
        .update_article(
            "stable-title",
            ArticlePatch {
                body: Some("new body".to_string()),
                summary: Some(Some("short".to_string())),
                ..ArticlePatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.article.title, "Stable Title");
    assert_eq!(updated.article.slug, "stable-title");
    assert_eq!(updated.article.body, "new body");
    assert_eq!(updated.article.summary.as_deref(), Some("short"));
    assert_eq!(updated.article.published_at, created.article.published_at);
    assert_eq!(updated.tags.len(), 1);
}

#[test]
fn publish_flip_keeps_counters_and_timestamp_in_lockstep() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let go = new_tag(&mut conn, "Go");

    {
        let mut service = content(&mut conn);
        service
            .create_article(draft("Draft Post", &dev, &[&go], false))
            .unwrap();
    }
    // Published-only counting: a draft contributes nothing.
    assert_eq!(category_by_slug(&mut conn, "dev").post_count, 0);
    assert_eq!(tag_by_slug(&mut conn, "go").post_count, 0);

    {
        let mut service = content(&mut conn);
        let published = service
            .update_article(
                "draft-post",
                ArticlePatch {
                    published: Some(true),
                    ..ArticlePatch::default()
                },
            )
            .unwrap();
        assert!(published.article.published_at.is_some());
        assert_eq!(published.category.post_count, 1);
    }
    assert_eq!(tag_by_slug(&mut conn, "go").post_count, 1);

    {
        let mut service = content(&mut conn);
        let unpublished = service
            .update_article(
                "draft-post",
                ArticlePatch {
                    published: Some(false),
                    ..ArticlePatch::default()
                },
            )
            .unwrap();
        assert_eq!(unpublished.article.published_at, None);
        assert_eq!(unpublished.category.post_count, 0);
    }
    assert_eq!(tag_by_slug(&mut conn, "go").post_count, 0);
}

#[test]
fn recategorize_recounts_both_sides() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let ops = new_category(&mut conn, "Ops");

    {
        let mut service = content(&mut conn);
        service
            .create_article(draft("Moving", &dev, &[], true))
            .unwrap();
    }
    assert_eq!(category_by_slug(&mut conn, "dev").post_count, 1);

    {
        let mut service = content(&mut conn);
        service
            .update_article(
                "moving",
                ArticlePatch {
                    category_id: Some(ops.uuid),
                    ..ArticlePatch::default()
                },
            )
            .unwrap();
    }
    assert_eq!(category_by_slug(&mut conn, "dev").post_count, 0);
    assert_eq!(category_by_slug(&mut conn, "ops").post_count, 1);
}

#[test]
fn delete_decrements_category_and_all_prior_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let t1 = new_tag(&mut conn, "Rust");
    let t2 = new_tag(&mut conn, "SQLite");

    {
        let mut service = content(&mut conn);
        service
            .create_article(draft("Doomed", &dev, &[&t1, &t2], true))
            .unwrap();
        service.delete_article("doomed").unwrap();

        let err = service.delete_article("doomed").unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }

    assert_eq!(category_by_slug(&mut conn, "dev").post_count, 0);
    assert_eq!(tag_by_slug(&mut conn, "rust").post_count, 0);
    assert_eq!(tag_by_slug(&mut conn, "sqlite").post_count, 0);
    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM article_tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
}

#[test]
fn unknown_tag_ids_are_all_listed_in_one_error() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let ghost_a = Uuid::new_v4();
    let ghost_b = Uuid::new_v4();

    let mut service = content(&mut conn);
    let mut input = draft("No Tags", &dev, &[], true);
    input.tag_ids = vec![ghost_a, ghost_b];
    let err = service.create_article(input).unwrap_err();

    match err {
        RepoError::Validation(message) => {
            assert!(message.contains(&ghost_a.to_string()));
            assert!(message.contains(&ghost_b.to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_and_get_report_not_found_for_unknown_slug() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = content(&mut conn);

    let err = service
        .update_article("missing", ArticlePatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    let err = service.get_article("missing").unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn aggregate_serializes_with_stable_field_names() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let go = new_tag(&mut conn, "Go");

    let mut service = content(&mut conn);
    let created = service
        .create_article(draft("Wire Shape", &dev, &[&go], true))
        .unwrap();

    let json = serde_json::to_value(&created).unwrap();
    assert_eq!(json["article"]["slug"], "wire-shape");
    assert_eq!(json["category"]["slug"], "dev");
    assert_eq!(json["tags"][0]["slug"], "go");
    assert_eq!(json["article"]["view_count"], 0);
}

fn content<'c>(conn: &'c mut Connection) -> ContentService<SqliteArticleRepository<'c>> {
    ContentService::new(SqliteArticleRepository::new(conn))
}

fn new_category(conn: &mut Connection, name: &str) -> Category {
    let mut service = TaxonomyService::new(SqliteTaxonomyRepository::new(conn));
    service
        .create_category(CategoryDraft {
            name: name.to_string(),
            description: None,
        })
        .unwrap()
}

fn new_tag(conn: &mut Connection, name: &str) -> Tag {
    let mut service = TaxonomyService::new(SqliteTaxonomyRepository::new(conn));
    service.create_tag(name).unwrap()
}

fn category_by_slug(conn: &mut Connection, slug: &str) -> Category {
    TaxonomyService::new(SqliteTaxonomyRepository::new(conn))
        .get_category(slug)
        .unwrap()
}

fn tag_by_slug(conn: &mut Connection, slug: &str) -> Tag {
    TaxonomyService::new(SqliteTaxonomyRepository::new(conn))
        .get_tag(slug)
        .unwrap()
}

fn draft(title: &str, category: &Category, tags: &[&Tag], published: bool) -> ArticleDraft {
    ArticleDraft {
        title: title.to_string(),
        body: format!("{title} body"),
        summary: None,
        cover_path: None,
        published,
        category_id: category.uuid,
        author_id: "author-1".to_string(),
        tag_ids: tags.iter().map(|tag| tag.uuid).collect(),
    }
}
