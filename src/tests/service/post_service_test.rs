#[cfg(test)]
mod tests {
    use crate::errors::AppError;
    use crate::model::post::{Post, PostUpdate};
    use crate::tests::common::{count, post_create, setup_db, tag_row};

    fn update(title: &str, tags: Option<&str>) -> PostUpdate {
        PostUpdate {
            title: title.to_string(),
            subtitle: Some("sub".to_string()),
            body: "edited body".to_string(),
            tags: tags.map(str::to_string),
            is_draft: false,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_slug_and_tags() {
        let pool = setup_db().await;
        let created = Post::create(&pool, &post_create("My first post", Some("js, web")))
            .await
            .unwrap();

        assert_eq!(created.slug, "my-first-post");

        let post = Post::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(post.row.title, "My first post");
        assert_eq!(post.tags, vec!["js", "web"]);
        assert_eq!(post.slug.as_deref(), Some("my-first-post"));
    }

    #[tokio::test]
    async fn test_create_without_tags() {
        let pool = setup_db().await;
        let created = Post::create(&pool, &post_create("No tags here", None))
            .await
            .unwrap();

        let post = Post::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert!(post.tags.is_empty());
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM tags").await, 0);
    }

    #[tokio::test]
    async fn test_update_edits_row_and_reconciles_tags() {
        let pool = setup_db().await;
        let created = Post::create(&pool, &post_create("First", Some("js, web")))
            .await
            .unwrap();

        let slug = Post::update(&pool, created.id, &update("First", Some("web, css")))
            .await
            .unwrap();
        assert_eq!(slug, "first");

        let post = Post::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(post.row.body, "edited body");
        assert_eq!(post.tags, vec!["css", "web"]);
        assert!(tag_row(&pool, "js").await.unwrap().deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let pool = setup_db().await;
        let err = Post::update(&pool, 999, &update("Title", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_historical_slug_resolves_with_redirect_flag() {
        let pool = setup_db().await;
        let created = Post::create(&pool, &post_create("Foo", None)).await.unwrap();
        Post::update(&pool, created.id, &update("Bar", None)).await.unwrap();

        let (post, is_current) = Post::find_by_slug(&pool, "foo").await.unwrap().unwrap();
        assert!(!is_current);
        // The caller redirects here to the canonical slug.
        assert_eq!(post.slug.as_deref(), Some("bar"));

        let (_, is_current) = Post::find_by_slug(&pool, "bar").await.unwrap().unwrap();
        assert!(is_current);

        assert!(Post::find_by_slug(&pool, "baz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_soft_deletes_and_releases_tags() {
        let pool = setup_db().await;
        let created = Post::create(&pool, &post_create("Going away", Some("js")))
            .await
            .unwrap();

        Post::delete(&pool, created.id).await.unwrap();

        assert!(Post::find_by_id(&pool, created.id).await.unwrap().is_none());
        assert!(Post::find_by_slug(&pool, "going-away").await.unwrap().is_none());
        assert!(tag_row(&pool, "js").await.unwrap().deleted_at.is_some());
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM tags_posts").await, 0);

        // Already gone; a second delete is a structural error.
        let err = Post::delete(&pool, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
