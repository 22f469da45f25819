use chrono::Utc;
use edusmart_client::{
    api::{
        Author, CommentId, CommentRecord, CourseId, ModuleId, Scope, UserId, UserProfile, Uuid,
    },
    ListKey, ListState, Node, StoreError, SyncStatus, ThreadView,
};
use edusmart_mock_server::{MockServer, Op};

fn instructor() -> UserProfile {
    UserProfile {
        id: UserId(Uuid::new_v4()),
        display_name: Some("Prof. Okafor".to_string()),
        avatar_url: Some("https://cdn.example/avatar.png".to_string()),
    }
}

fn seed(server: &MockServer, scope: Scope, parent: Option<CommentId>, body: &str) -> CommentId {
    let id = CommentId::generate();
    server
        .admin_add_comment(CommentRecord {
            id,
            parent_id: parent,
            author: Author {
                id: UserId(Uuid::new_v4()),
                display_name: Some("Student".to_string()),
                avatar_url: None,
            },
            body: body.to_string(),
            created_at: Utc::now(),
            scope,
        })
        .expect("seeding comment");
    id
}

fn course_view(server: MockServer, course: CourseId) -> ThreadView<MockServer> {
    ThreadView::new(ListKey::Course(course), instructor(), server)
}

#[tokio::test]
async fn load_rebuilds_the_thread_from_the_flat_list() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    let question = seed(&server, scope, None, "What is ownership?");
    let answer = seed(&server, scope, Some(question), "Read chapter 4");
    let follow_up = seed(&server, scope, Some(answer), "Thanks!");

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");

    assert_eq!(view.state(), ListState::Ready);
    assert_eq!(view.comments().len(), 1);
    assert_eq!(view.comments()[0].id(), question);
    assert_eq!(view.comments()[0].replies[0].id(), answer);
    assert_eq!(view.comments()[0].replies[0].replies[0].id(), follow_up);
}

#[tokio::test]
async fn created_comment_gets_the_server_id_on_success() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    let id = view
        .create_comment(scope, "Welcome to the course".to_string())
        .await
        .expect("creating comment");

    assert_eq!(view.comments().len(), 1);
    let node = &view.comments()[0];
    assert_eq!(node.id(), id);
    assert_eq!(node.status, SyncStatus::Confirmed);
    // And the server agrees on the id
    let server_side = view.api().test_comments(scope);
    assert_eq!(server_side.len(), 1);
    assert_eq!(server_side[0].id, id);
}

#[tokio::test]
async fn failed_create_is_rolled_back_by_a_refetch() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    let existing = seed(&server, scope, None, "Existing question");
    server.fail_next(Op::CreateComment);

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    let err = view
        .create_comment(scope, "Will not stick".to_string())
        .await
        .expect_err("create was set up to fail");
    assert!(matches!(err, StoreError::Network(_)));

    // The optimistic node is gone, server truth is back
    assert_eq!(view.comments().len(), 1);
    assert_eq!(view.comments()[0].id(), existing);
    // load + reconciliation refetch
    assert_eq!(view.api().test_num_calls(Op::ListComments), 2);
}

#[tokio::test]
async fn failed_delete_restores_the_removed_subtree() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    let root = seed(&server, scope, None, "Root");
    let reply = seed(&server, scope, Some(root), "Reply");
    server.fail_next(Op::DeleteComment);

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    view.delete_comment(root)
        .await
        .expect_err("delete was set up to fail");

    assert!(Node::get_in(view.comments(), &root).is_some());
    assert!(Node::get_in(view.comments(), &reply).is_some());
}

#[tokio::test]
async fn delete_takes_the_whole_subtree_with_it() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    let root = seed(&server, scope, None, "Root");
    let child = seed(&server, scope, Some(root), "Child");
    let grandchild = seed(&server, scope, Some(child), "Grandchild");
    let other = seed(&server, scope, None, "Other thread");

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    view.delete_comment(child).await.expect("deleting child");

    for gone in [child, grandchild] {
        assert!(Node::get_in(view.comments(), &gone).is_none());
        assert!(!view.api().test_comments(scope).iter().any(|c| c.id == gone));
    }
    assert!(Node::get_in(view.comments(), &root).is_some());
    assert!(Node::get_in(view.comments(), &other).is_some());
}

#[tokio::test]
async fn aggregated_view_joins_all_modules_and_routes_replies() {
    let course = CourseId(Uuid::new_v4());
    let module_a = ModuleId(Uuid::new_v4());
    let module_b = ModuleId(Uuid::new_v4());
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    server
        .admin_create_module(course, module_a)
        .expect("creating module a");
    server
        .admin_create_module(course, module_b)
        .expect("creating module b");
    let in_a = seed(&server, Scope::Module(module_a), None, "Question in A");
    let in_b = seed(&server, Scope::Module(module_b), None, "Question in B");

    let mut view = ThreadView::new(ListKey::AllModules(course), instructor(), server);
    view.load().await.expect("initial load");
    assert!(Node::get_in(view.comments(), &in_a).is_some());
    assert!(Node::get_in(view.comments(), &in_b).is_some());

    // The reply must land under module B's endpoint, resolved from the
    // target's own record
    let reply = view
        .reply_to_comment(in_b, "Answer in B".to_string())
        .await
        .expect("replying in aggregated view");
    let b_comments = view.api().test_comments(Scope::Module(module_b));
    assert!(b_comments.iter().any(|c| c.id == reply));
    assert!(!view
        .api()
        .test_comments(Scope::Module(module_a))
        .iter()
        .any(|c| c.id == reply));
}

#[tokio::test]
async fn reply_to_unknown_target_issues_no_network_call() {
    let course = CourseId(Uuid::new_v4());
    let server = MockServer::new(instructor());
    server.admin_create_course(course);

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    let missing = CommentId::generate();
    let err = view
        .reply_to_comment(missing, "into the void".to_string())
        .await
        .expect_err("target does not exist");
    assert!(matches!(err, StoreError::TargetNotFound(id) if id == missing));
    assert_eq!(view.api().test_num_calls(Op::ReplyToComment), 0);
    // And no reconciliation refetch either: only the initial load happened
    assert_eq!(view.api().test_num_calls(Op::ListComments), 1);
}

#[tokio::test]
async fn body_validation_happens_before_any_optimistic_edit() {
    let course = CourseId(Uuid::new_v4());
    let scope = Scope::Course(course);
    let server = MockServer::new(instructor());
    server.admin_create_course(course);

    let mut view = course_view(server, course);
    view.load().await.expect("initial load");
    let err = view
        .create_comment(scope, "bad\0body".to_string())
        .await
        .expect_err("null byte must be refused");
    assert!(matches!(err, StoreError::Backend(_)));
    assert!(view.comments().is_empty());
    assert_eq!(view.api().test_num_calls(Op::CreateComment), 0);
}

#[tokio::test]
async fn initial_fetch_failure_is_terminal_until_the_user_retries() {
    let course = CourseId(Uuid::new_v4());
    let server = MockServer::new(instructor());
    server.admin_create_course(course);
    seed(&server, Scope::Course(course), None, "There is content");
    server.fail_next(Op::ListComments);

    let mut view = course_view(server, course);
    let err = view.load().await.expect_err("load was set up to fail");
    assert!(matches!(err, StoreError::Network(_)));
    assert_eq!(view.state(), ListState::Failed);
    assert!(view.comments().is_empty());

    // A manual refresh recovers
    view.refresh().await.expect("second fetch succeeds");
    assert_eq!(view.state(), ListState::Ready);
    assert_eq!(view.comments().len(), 1);
}
