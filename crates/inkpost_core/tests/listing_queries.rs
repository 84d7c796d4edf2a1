use inkpost_core::db::open_db_in_memory;
use inkpost_core::{
    ArticleDraft, ArticleListQuery, ArticleSort, Category, CategoryDraft, ContentService,
    SortDir, SortKey, SqliteArticleRepository, SqliteTaxonomyRepository, Tag, TaxonomyService,
};
use rusqlite::Connection;

#[test]
fn pagination_returns_requested_window_and_full_total() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");

    {
        let mut service = content(&mut conn);
        for idx in 1..=25 {
            service
                .create_article(draft(&format!("Post {idx:02}"), &dev, &[], true))
                .unwrap();
        }
        service
            .create_article(draft("Hidden Draft", &dev, &[], false))
            .unwrap();
    }
    force_insertion_order(&conn);

    let service = content(&mut conn);
    let page = service
        .list_articles(&ArticleListQuery {
            published: Some(true),
            page: 2,
            limit: 10,
            ..ArticleListQuery::default()
        })
        .unwrap();

    assert_eq!(page.total, 25);
    assert_eq!(page.items.len(), 10);
    // created_at DESC: page 2 holds items 11..=20 of the matching set.
    assert_eq!(page.items[0].article.title, "Post 15");
    assert_eq!(page.items[9].article.title, "Post 06");
}

#[test]
fn each_filter_is_independently_optional() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");
    let ops = new_category(&mut conn, "Ops");
    let rust = new_tag(&mut conn, "Rust");

    {
        let mut service = content(&mut conn);
        let mut by_alice = draft("Alice In Dev", &dev, &[&rust], true);
        by_alice.author_id = "alice".to_string();
        service.create_article(by_alice).unwrap();

        let mut by_bob = draft("Bob In Ops", &ops, &[], true);
        by_bob.author_id = "bob".to_string();
        service.create_article(by_bob).unwrap();

        let mut bob_draft = draft("Bob Draft", &ops, &[], false);
        bob_draft.author_id = "bob".to_string();
        service.create_article(bob_draft).unwrap();
    }

    let service = content(&mut conn);

    let all = service.list_articles(&ArticleListQuery::default()).unwrap();
    assert_eq!(all.total, 3);

    let published = service
        .list_articles(&ArticleListQuery {
            published: Some(true),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(published.total, 2);

    let in_dev = service
        .list_articles(&ArticleListQuery {
            category_id: Some(dev.uuid),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(in_dev.total, 1);
    assert_eq!(in_dev.items[0].article.title, "Alice In Dev");

    let by_bob = service
        .list_articles(&ArticleListQuery {
            author_id: Some("bob".to_string()),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(by_bob.total, 2);

    let tagged = service
        .list_articles(&ArticleListQuery {
            tag_id: Some(rust.uuid),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(tagged.total, 1);
    assert_eq!(tagged.items[0].article.title, "Alice In Dev");

    let combined = service
        .list_articles(&ArticleListQuery {
            published: Some(true),
            author_id: Some("bob".to_string()),
            category_id: Some(ops.uuid),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(combined.total, 1);
    assert_eq!(combined.items[0].article.title, "Bob In Ops");
}

#[test]
fn search_matches_title_body_or_summary() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");

    {
        let mut service = content(&mut conn);
        let mut in_title = draft("Needle Title", &dev, &[], true);
        in_title.body = "plain".to_string();
        service.create_article(in_title).unwrap();

        let mut in_body = draft("Body Match", &dev, &[], true);
        in_body.body = "the needle is in here".to_string();
        service.create_article(in_body).unwrap();

        let mut in_summary = draft("Summary Match", &dev, &[], true);
        in_summary.body = "plain".to_string();
        in_summary.summary = Some("summary needle".to_string());
        service.create_article(in_summary).unwrap();

        service
            .create_article(draft("Unrelated", &dev, &[], true))
            .unwrap();
    }

    let service = content(&mut conn);
    let found = service
        .list_articles(&ArticleListQuery {
            search: Some("needle".to_string()),
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(found.total, 3);
}

#[test]
fn sort_keys_are_allow_listed_and_directional() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");

    {
        let mut service = content(&mut conn);
        for title in ["Cherry", "Apple", "Banana"] {
            service.create_article(draft(title, &dev, &[], true)).unwrap();
        }
    }

    let title_asc = {
        let service = content(&mut conn);
        service
            .list_articles(&ArticleListQuery {
                sort: ArticleSort {
                    key: SortKey::Title,
                    dir: SortDir::Asc,
                },
                ..ArticleListQuery::default()
            })
            .unwrap()
    };
    let titles: Vec<&str> = title_asc
        .items
        .iter()
        .map(|item| item.article.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Apple", "Banana", "Cherry"]);

    // Reads bump the view counter; the most-read row sorts first.
    {
        let service = content(&mut conn);
        service.get_article("banana").unwrap();
        service.get_article("banana").unwrap();
        service.get_article("apple").unwrap();
    }
    let by_views = {
        let service = content(&mut conn);
        service
            .list_articles(&ArticleListQuery {
                sort: ArticleSort {
                    key: SortKey::ViewCount,
                    dir: SortDir::Desc,
                },
                ..ArticleListQuery::default()
            })
            .unwrap()
    };
    assert_eq!(by_views.items[0].article.title, "Banana");
    assert_eq!(by_views.items[0].article.view_count, 2);
}

#[test]
fn page_and_limit_are_normalized() {
    let mut conn = open_db_in_memory().unwrap();
    let dev = new_category(&mut conn, "Dev");

    {
        let mut service = content(&mut conn);
        for idx in 0..3 {
            service
                .create_article(draft(&format!("Entry {idx}"), &dev, &[], true))
                .unwrap();
        }
    }

    let service = content(&mut conn);
    let clamped_low = service
        .list_articles(&ArticleListQuery {
            page: 0,
            limit: 0,
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(clamped_low.items.len(), 1);
    assert_eq!(clamped_low.total, 3);

    let clamped_high = service
        .list_articles(&ArticleListQuery {
            limit: 500,
            ..ArticleListQuery::default()
        })
        .unwrap();
    assert_eq!(clamped_high.items.len(), 3);
}

/// Creation inside one test shares a wall-clock millisecond; rewrite
/// `created_at` to insertion order so the sort assertions are deterministic.
fn force_insertion_order(conn: &Connection) {
    conn.execute("UPDATE articles SET created_at = rowid;", [])
        .unwrap();
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
