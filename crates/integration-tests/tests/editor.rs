//! Admin editor: add, modify, delete and group delete.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};

use grace_codex_core::{Category, GroupKind};
use grace_codex_site::db::ContentStore;
use grace_codex_integration_tests::{TestApp, body_text, location};

#[tokio::test]
async fn test_add_armor_redirects_to_detail_page() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let response = app
        .post_form(
            "/editor/armor/add",
            "name=Raging+Wolf+Helm&group_id=&slot=Head&weight=5.20&poise=7&description=Worn+by+Redmane+knights",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let detail = location(&response).to_owned();
    assert!(detail.starts_with("/armors/"), "{detail}");

    let page = app.get(&detail, None).await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = body_text(page).await;
    assert!(body.contains("Raging Wolf Helm"));
    assert!(body.contains("head"));
    assert!(body.contains("5.2"));
    assert!(body.contains("Worn by Redmane knights"));
}

#[tokio::test]
async fn test_invalid_add_rerenders_form_without_saving() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let response = app
        .post_form("/editor/armor/add", "name=&slot=cape&weight=heavy", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("is required"));
    assert!(body.contains("must be a number"));

    assert!(app.content.inner().list(Category::Armor).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_with_unknown_group_is_rejected() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let response = app
        .post_form(
            "/editor/weapons/add",
            "name=Uchigatana&group_id=99&attack_power=115&weight=5.5",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.content.inner().list(Category::Weapon).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_modify_without_id_renders_chooser() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    for category in Category::ALL {
        let uri = format!("/editor/{}/modify", category.editor_slug());
        let response = app.get(&uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");

        let response = app.post_form(&uri, "name=Changed", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
    }

    assert_eq!(app.content.mutations(), 0);
}

#[tokio::test]
async fn test_modify_chooser_lists_items() {
    let app = TestApp::new();
    let id = app
        .seed_item(Category::Npc, &[("name", "Blaidd"), ("location", "Mistwood")])
        .await;
    let cookie = app.admin("melina").await;

    let body = body_text(app.get("/editor/npcs/modify", Some(&cookie)).await).await;
    assert!(body.contains("Blaidd"));
    assert!(body.contains(&format!("/editor/npcs/modify/{id}")));
}

#[tokio::test]
async fn test_modify_updates_item() {
    let app = TestApp::new();
    let id = app
        .seed_item(
            Category::Npc,
            &[("name", "Blaidd"), ("location", "Mistwood"), ("role", "Half-wolf")],
        )
        .await;
    let cookie = app.admin("melina").await;

    let form_page = body_text(
        app.get(&format!("/editor/npcs/modify/{id}"), Some(&cookie))
            .await,
    )
    .await;
    assert!(form_page.contains("Mistwood"));

    let response = app
        .post_form(
            &format!("/editor/npcs/modify/{id}"),
            "name=Blaidd&location=Ranni%27s+Rise&role=",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/npcs/{id}"));

    let item = app.item(Category::Npc, id).await.unwrap();
    assert_eq!(item.attribute("location"), Some("Ranni's Rise"));
    assert_eq!(item.attribute("role"), None);
}

#[tokio::test]
async fn test_invalid_modify_rerenders_form_without_saving() {
    let app = TestApp::new();
    let id = app
        .seed_item(
            Category::Armor,
            &[("name", "Raging Wolf Helm"), ("slot", "Head"), ("weight", "5.2")],
        )
        .await;
    let cookie = app.admin("melina").await;
    let before = app.item(Category::Armor, id).await.unwrap();

    let response = app
        .post_form(
            &format!("/editor/armor/modify/{id}"),
            "name=&slot=Head&weight=heavy",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("is required"));
    assert!(body.contains("must be a number"));
    assert!(body.contains("heavy"));

    assert_eq!(app.content.mutations(), 0);
    let after = app.item(Category::Armor, id).await.unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.attribute("weight"), before.attribute("weight"));
}

#[tokio::test]
async fn test_modify_missing_item_is_not_found() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let response = app
        .post_form("/editor/npcs/modify/5", "name=Nobody&location=Nowhere", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.content.inner().list(Category::Npc).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent_for_every_category() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let bolster = app
        .seed_item(Category::Bolster, &[("name", "Golden Seed"), ("effect", "More flask charges")])
        .await;

    for category in Category::ALL {
        let uri = format!("/editor/{}/delete/{bolster}", category.editor_slug());
        let first = app.request(Method::POST, &uri, Some(&cookie)).await;
        let second = app.request(Method::POST, &uri, Some(&cookie)).await;

        assert_eq!(first.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(second.status(), first.status(), "{uri}");
        assert_eq!(location(&second), location(&first), "{uri}");
        assert_eq!(
            location(&first),
            format!("/editor/{}", category.editor_slug())
        );
    }

    assert!(app.item(Category::Bolster, bolster).await.is_none());
}

#[tokio::test]
async fn test_delete_confirmation_then_delete() {
    let app = TestApp::new();
    let id = app
        .seed_item(Category::Talisman, &[("name", "Erdtree Favor"), ("effect", "Raises HP")])
        .await;
    let cookie = app.admin("melina").await;

    let confirm = app
        .get(&format!("/editor/talismans/delete/{id}"), Some(&cookie))
        .await;
    assert_eq!(confirm.status(), StatusCode::OK);
    assert!(body_text(confirm).await.contains("Erdtree Favor"));
    assert!(app.item(Category::Talisman, id).await.is_some());

    let chooser = body_text(app.get("/editor/talismans/delete", Some(&cookie)).await).await;
    assert!(chooser.contains(&format!("/editor/talismans/delete/{id}")));

    app.request(
        Method::POST,
        &format!("/editor/talismans/delete/{id}"),
        Some(&cookie),
    )
    .await;
    assert!(app.item(Category::Talisman, id).await.is_none());
}

#[tokio::test]
async fn test_group_delete_keeps_members() {
    let app = TestApp::new();
    let set = app.seed_group(GroupKind::ArmorSet, "Raging Wolf Set").await;
    let set_id = set.to_string();
    let helm = app
        .seed_item(
            Category::Armor,
            &[
                ("name", "Raging Wolf Helm"),
                ("slot", "head"),
                ("weight", "5.2"),
                ("group_id", set_id.as_str()),
            ],
        )
        .await;
    let cookie = app.admin("melina").await;

    let confirm = body_text(
        app.get(&format!("/editor/armor/set/delete/{set}"), Some(&cookie))
            .await,
    )
    .await;
    assert!(confirm.contains("Raging Wolf Set"));

    let response = app
        .request(
            Method::POST,
            &format!("/editor/armor/set/delete/{set}"),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/editor/armor");

    let helm = app.item(Category::Armor, helm).await.unwrap();
    assert_eq!(helm.group_id, None);
    assert_eq!(
        app.get(&format!("/armor_sets/{set}"), None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_editor_hub_lists_every_category() {
    let app = TestApp::new();
    let cookie = app.admin("melina").await;

    let body = body_text(app.get("/editor", Some(&cookie)).await).await;
    for category in Category::ALL {
        assert!(
            body.contains(&format!("/editor/{}", category.editor_slug())),
            "{category}"
        );
    }
}
