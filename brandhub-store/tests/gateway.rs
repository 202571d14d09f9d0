use std::sync::Arc;

use brandhub_core::{context, ErrorKind, HubError, Principal, StoreCoordinates, Tenant, TenantContext, TenantName};
use brandhub_store::{BrandAdmin, Task, TenantGateway, User};

fn gateway() -> TenantGateway {
    let gw = TenantGateway::new();
    gw.attach(&Tenant::new(1, "branda", StoreCoordinates::local("brand_a")));
    gw.attach(&Tenant::new(2, "brandb", StoreCoordinates::local("brand_b")));
    gw
}

fn user(email: &str, brand: &str) -> User {
    User::new("Ada", "Lovelace", email, "hash", TenantName::new(brand))
}

fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
    HubError::kind_of(err)
}

#[tokio::test]
async fn begin_requires_a_bound_tenant() {
    let gw = gateway();
    assert!(gw.begin(None).await.is_err());
}

#[tokio::test]
async fn writes_land_in_the_context_tenant_only() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        s.insert(user("a@x.com", "branda")).await.unwrap();
        s.commit().unwrap();
    })
    .await;

    assert_eq!(gw.row_count::<User>(&TenantName::new("branda")).await.unwrap(), 1);
    assert_eq!(gw.row_count::<User>(&TenantName::new("brandb")).await.unwrap(), 0);
}

#[tokio::test]
async fn same_email_in_two_tenants_but_not_twice_in_one() {
    let gw = gateway();
    for brand in ["branda", "brandb"] {
        context::scope(TenantContext::new(brand), async {
            let mut s = gw.begin(None).await.unwrap();
            s.insert(user("a@x.com", brand)).await.unwrap();
            s.commit().unwrap();
        })
        .await;
    }

    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        let err = s.insert(user("A@x.com", "branda")).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Conflict));
    })
    .await;
}

#[tokio::test]
async fn dropped_sessions_roll_back() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        s.insert(Task::new(1, "bikes")).await.unwrap();
        // visible inside the transaction
        assert_eq!(s.count::<Task, _>(|_| true).await.unwrap(), 1);
        drop(s);

        let mut s = gw.begin(None).await.unwrap();
        assert_eq!(s.count::<Task, _>(|_| true).await.unwrap(), 0);
        s.rollback();
    })
    .await;
    assert_eq!(gw.row_count::<Task>(&TenantName::new("branda")).await.unwrap(), 0);
}

#[tokio::test]
async fn principal_from_another_tenant_is_forbidden() {
    let gw = gateway();
    context::scope(TenantContext::new("brandb"), async {
        let err = gw
            .begin(Some(Principal::user(1, "branda")))
            .await
            .err()
            .unwrap();
        assert_eq!(kind(&err), Some(ErrorKind::Forbidden));
    })
    .await;
}

#[tokio::test]
async fn session_refuses_work_after_the_context_moves() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        context::set(TenantName::new("brandb")).unwrap();
        let err = s.insert(Task::new(1, "bikes")).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Forbidden));
        assert!(s.commit().is_err());
    })
    .await;
    assert_eq!(gw.row_count::<Task>(&TenantName::new("branda")).await.unwrap(), 0);
    assert_eq!(gw.row_count::<Task>(&TenantName::new("brandb")).await.unwrap(), 0);
}

#[tokio::test]
async fn global_records_always_go_to_the_default_store() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        let admin = BrandAdmin {
            id: 0,
            firstname: "Grace".into(),
            surname: "Hopper".into(),
            email: "g@x.com".into(),
            password: "hash".into(),
            brand_name: TenantName::new("branda"),
            is_active: false,
            created_at: None,
            updated_at: None,
        };
        s.insert(admin).await.unwrap();
        s.commit().unwrap();
    })
    .await;

    assert_eq!(gw.default_store().row_count("brand_admins").await, 1);
    assert_eq!(gw.for_tenant(&TenantName::new("branda")).unwrap().row_count("brand_admins").await, 0);
}

#[tokio::test]
async fn update_checks_uniqueness_and_existence() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        s.insert(Task::new(7, "bikes")).await.unwrap();
        let mut second = s.insert(Task::new(7, "boats")).await.unwrap();

        second.saved_search = "bikes".into();
        let err = s.update(&mut second).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Conflict));

        second.saved_search = "cars".into();
        s.update(&mut second).await.unwrap();
        assert!(second.updated_at.is_some());

        let mut ghost = Task::new(7, "ghost");
        ghost.id = 99;
        let err = s.update(&mut ghost).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::NotFound));

        assert_eq!(s.delete_where::<Task, _>(|t| t.userid == 7).await.unwrap(), 2);
        s.commit().unwrap();
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_sessions_across_tenants_stay_isolated() {
    let gw = Arc::new(gateway());
    let mut handles = Vec::new();
    for i in 0..40u64 {
        let gw = Arc::clone(&gw);
        let brand = if i % 2 == 0 { "branda" } else { "brandb" };
        handles.push(tokio::spawn(context::scope(TenantContext::new(brand), async move {
            let mut s = gw.begin(Some(Principal::user(i, brand))).await?;
            s.insert(Task::new(i, format!("{brand}-{i}"))).await?;
            tokio::task::yield_now().await;
            s.commit()
        })));
    }
    for r in futures::future::join_all(handles).await {
        r.unwrap().unwrap();
    }

    for brand in ["branda", "brandb"] {
        context::scope(TenantContext::new(brand), async {
            let mut s = gw.begin(None).await.unwrap();
            let tasks = s.find::<Task, _>(|_| true).await.unwrap();
            assert_eq!(tasks.len(), 20);
            assert!(tasks.iter().all(|t| t.saved_search.starts_with(brand)));
        })
        .await;
    }
}

#[tokio::test]
async fn open_sessions_on_one_tenant_do_not_block_each_other() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut slow = gw.begin(None).await.unwrap();
        slow.insert(Task::new(1, "bikes")).await.unwrap();

        // `slow` is still open; a second session reads, writes and commits.
        let mut fast = gw.begin(None).await.unwrap();
        assert_eq!(fast.count::<Task, _>(|_| true).await.unwrap(), 0);
        fast.insert(Task::new(2, "boats")).await.unwrap();
        fast.commit().unwrap();

        assert_eq!(slow.count::<Task, _>(|_| true).await.unwrap(), 2);
        slow.commit().unwrap();
    })
    .await;
    assert_eq!(gw.row_count::<Task>(&TenantName::new("branda")).await.unwrap(), 2);
}

#[tokio::test]
async fn stale_updates_are_refused_at_commit() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut s = gw.begin(None).await.unwrap();
        let id = s.insert(Task::new(1, "bikes")).await.unwrap().id;
        s.commit().unwrap();

        let mut a = gw.begin(None).await.unwrap();
        let mut b = gw.begin(None).await.unwrap();
        let mut seen_by_a = a.get::<Task>(id).await.unwrap().unwrap();
        let mut seen_by_b = b.get::<Task>(id).await.unwrap().unwrap();

        seen_by_b.saved_search = "boats".into();
        b.update(&mut seen_by_b).await.unwrap();
        b.commit().unwrap();

        seen_by_a.saved_search = "cars".into();
        a.update(&mut seen_by_a).await.unwrap();
        let err = a.commit().unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Conflict));

        let mut check = gw.begin(None).await.unwrap();
        assert_eq!(check.get::<Task>(id).await.unwrap().unwrap().saved_search, "boats");
    })
    .await;
}

#[tokio::test]
async fn concurrent_duplicates_lose_at_commit() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut a = gw.begin(None).await.unwrap();
        let mut b = gw.begin(None).await.unwrap();
        a.insert(user("dup@x.com", "branda")).await.unwrap();
        b.insert(user("DUP@x.com", "branda")).await.unwrap();

        a.commit().unwrap();
        let err = b.commit().unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Conflict));
    })
    .await;
    assert_eq!(gw.row_count::<User>(&TenantName::new("branda")).await.unwrap(), 1);
}

#[tokio::test]
async fn limits_count_rows_committed_by_others() {
    let gw = gateway();
    context::scope(TenantContext::new("branda"), async {
        let mut a = gw.begin(None).await.unwrap();
        let mut b = gw.begin(None).await.unwrap();
        for (s, search) in [(&mut a, "bikes"), (&mut b, "boats")] {
            // both see zero tasks and stay under a limit of one
            assert_eq!(s.count::<Task, _>(|t| t.userid == 5).await.unwrap(), 0);
            s.insert(Task::new(5, search)).await.unwrap();
            s.limit::<Task, _>(1, "Task limit reached", |t| t.userid == 5).unwrap();
        }

        a.commit().unwrap();
        let err = b.commit().unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::BadRequest));
        assert_eq!(HubError::from_anyhow(&err).unwrap().message, "Task limit reached");
    })
    .await;
    assert_eq!(gw.row_count::<Task>(&TenantName::new("branda")).await.unwrap(), 1);
}
