use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::actor::Actor,
    dto::{
        comments::{
            ActionCommentRequest, ActionCommentResult, CommentListQuery, CommentResponse,
            CreateCommentRequest, UpdateCommentRequest,
        },
        common::{PageRequest, Paginated},
    },
    error::{AppError, AppResult},
    models::comments::{Comment, CommentAction, CommentLink, ROOT_PARENT_ID},
    repositories::{
        comments::{self as comment_repo, NewComment},
        surveys::{self as survey_repo, SurveyRow},
    },
    services::content,
    telemetry::{BusinessEvent, RequestContext},
    usecases::scope::{SurveyScope, resolve_scope},
};

pub struct CommentService;

impl CommentService {
    /// Lists comment trees on visible surveys; pagination counts roots only.
    pub async fn list(
        state: &AppState,
        actor: &Actor,
        query: CommentListQuery,
    ) -> AppResult<Paginated<CommentResponse>> {
        let window = query.page_request();
        let scope = resolve_scope(&state.db, actor).await;
        if scope == SurveyScope::Nothing {
            return Ok(Paginated::new(Vec::new(), 0, window));
        }

        let keyword = query.keyword();
        let comments =
            comment_repo::list_comments(&state.db, scope.binds(), query.survey, keyword.as_deref())
                .await?;

        Ok(paginate_roots(build_comment_tree(comments), window))
    }

    /// Comments on a survey outside the caller's scope read as missing.
    pub async fn get(
        state: &AppState,
        actor: &Actor,
        comment_id: i64,
    ) -> AppResult<CommentResponse> {
        let comment = comment_repo::find_comment(&state.db, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        if !survey_is_visible(state, actor, comment.survey_id).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        Ok(CommentResponse::from(comment))
    }

    pub async fn create_public(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        req: CreateCommentRequest,
    ) -> AppResult<CommentResponse> {
        let outcome = Self::create_comment(state, actor, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "CREATE_COMMENT", &outcome);
        outcome
    }

    async fn create_comment(
        state: &AppState,
        actor: &Actor,
        req: CreateCommentRequest,
    ) -> AppResult<CommentResponse> {
        validate_comment_text(&req.name, &req.detail)?;
        content::ensure_clean_text(
            &[req.name.as_str(), req.detail.as_str()],
            &state.config.banned_words,
        )?;
        content::ensure_valid_images(&req.images)?;
        if req.parent_id < ROOT_PARENT_ID {
            return Err(AppError::BadRequest("Invalid parent comment".to_string()));
        }

        if !survey_is_visible(state, actor, req.survey_id).await? {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }
        if req.parent_id != ROOT_PARENT_ID
            && !comment_repo::parent_on_survey(&state.db, req.parent_id, req.survey_id).await?
        {
            return Err(AppError::BadRequest(
                "Parent comment does not exist on this survey".to_string(),
            ));
        }

        let created_by = if actor.is_guest() {
            req.name.trim().to_string()
        } else {
            actor.label()
        };
        let comment = comment_repo::insert_comment(
            &state.db,
            NewComment {
                survey_id: req.survey_id,
                parent_id: req.parent_id,
                user_id: actor.user_id,
                name: req.name.trim(),
                detail: req.detail.trim(),
                images: &req.images,
                created_by: &created_by,
            },
        )
        .await?;

        BusinessEvent::CommentCreated {
            comment_id: comment.id,
            survey_id: comment.survey_id,
            parent_id: comment.parent_id,
            author_id: comment.user_id,
        }
        .log();

        Ok(CommentResponse::from(comment))
    }

    pub async fn update(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        comment_id: i64,
        req: UpdateCommentRequest,
    ) -> AppResult<CommentResponse> {
        let outcome = Self::update_comment(state, actor, comment_id, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "UPDATE_COMMENT", &outcome);
        outcome
    }

    async fn update_comment(
        state: &AppState,
        actor: &Actor,
        comment_id: i64,
        req: UpdateCommentRequest,
    ) -> AppResult<CommentResponse> {
        let actor_id = actor.require_user_id()?;
        validate_comment_text(&req.name, &req.detail)?;
        content::ensure_clean_text(
            &[req.name.as_str(), req.detail.as_str()],
            &state.config.banned_words,
        )?;
        content::ensure_valid_images(&req.images)?;

        let stored = comment_repo::find_comment(&state.db, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        if !actor.owns(stored.user_id) {
            return Err(AppError::Forbidden(
                "You can only edit your own comment".to_string(),
            ));
        }

        let comment = comment_repo::update_comment(
            &state.db,
            comment_id,
            req.name.trim(),
            req.detail.trim(),
            &req.images,
            &actor.label(),
        )
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        BusinessEvent::CommentUpdated {
            comment_id,
            actor_id,
        }
        .log();

        Ok(CommentResponse::from(comment))
    }

    pub async fn delete(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        comment_id: i64,
    ) -> AppResult<()> {
        let outcome = Self::delete_comment(state, actor, comment_id).await;
        state
            .audit
            .record_outcome(actor, ctx, "DELETE_COMMENT", &outcome);
        outcome
    }

    async fn delete_comment(state: &AppState, actor: &Actor, comment_id: i64) -> AppResult<()> {
        let actor_id = actor.require_user_id()?;

        let stored = comment_repo::find_comment(&state.db, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        if !can_delete(actor, &stored) {
            return Err(AppError::Forbidden(
                "You are not allowed to delete this comment".to_string(),
            ));
        }

        if !comment_repo::soft_delete_comment(&state.db, comment_id, &actor.label()).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        BusinessEvent::CommentDeleted {
            comment_id,
            actor_id,
        }
        .log();

        Ok(())
    }

    /// Resolves or reopens the whole thread connected to a comment.
    pub async fn action(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        req: ActionCommentRequest,
    ) -> AppResult<ActionCommentResult> {
        let outcome = Self::moderate_thread(state, actor, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "ACTION_COMMENT", &outcome);
        outcome
    }

    async fn moderate_thread(
        state: &AppState,
        actor: &Actor,
        req: ActionCommentRequest,
    ) -> AppResult<ActionCommentResult> {
        let action = CommentAction::parse(&req.action).ok_or(AppError::ValidationError(
            "Invalid action, expected Resolved or Unresolved".to_string(),
        ))?;
        let actor_id = actor.require_user_id()?;

        let work = async {
            let target = comment_repo::find_comment(&state.db, req.comment_id)
                .await?
                .ok_or(AppError::NotFound("Comment not found".to_string()))?;
            if !can_moderate(actor, &target) {
                return Err(AppError::Forbidden(
                    "You are not allowed to moderate this comment".to_string(),
                ));
            }

            let mut tx = state.db.begin().await?;
            let links = comment_repo::lock_thread_links(&mut tx, target.survey_id).await?;
            let thread = collect_thread(&links, target.id);
            let affected = comment_repo::apply_resolution(
                &mut tx,
                target.survey_id,
                &thread,
                action.is_resolved(),
                &actor.label(),
            )
            .await?;
            tx.commit().await?;

            Ok::<_, AppError>((target.survey_id, affected))
        };

        let (survey_id, affected) = tokio::time::timeout(state.config.request_timeout, work)
            .await
            .map_err(|_| {
                AppError::Timeout("Comment moderation did not complete in time".to_string())
            })??;

        BusinessEvent::CommentThreadModerated {
            comment_id: req.comment_id,
            survey_id,
            actor_id,
            action,
            affected,
        }
        .log();

        Ok(ActionCommentResult { affected })
    }
}

fn validate_comment_text(name: &str, detail: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::ValidationError("name is required".to_string()));
    }
    if detail.trim().is_empty() {
        return Err(AppError::ValidationError("detail is required".to_string()));
    }
    Ok(())
}

/// The survey must exist and fall inside the actor's scope, which hides
/// drafts from everyone but their owner.
async fn survey_is_visible(state: &AppState, actor: &Actor, survey_id: Uuid) -> AppResult<bool> {
    let Some(row) = survey_repo::find_survey(&state.db, survey_id).await? else {
        return Ok(false);
    };
    let scope = resolve_scope(&state.db, actor).await;
    Ok(survey_visible(&scope, &row))
}

pub(crate) fn survey_visible(scope: &SurveyScope, row: &SurveyRow) -> bool {
    scope.permits(
        row.survey.user_id,
        row.owner_balai_id,
        row.survey.is_submitted,
    )
}

/// Author or any PIC role.
pub fn can_moderate(actor: &Actor, comment: &Comment) -> bool {
    actor.owns(comment.user_id) || actor.role.is_pic()
}

/// Author only, whatever the role. Anonymous comments have no author to match.
pub fn can_delete(actor: &Actor, comment: &Comment) -> bool {
    actor.owns(comment.user_id)
}

/// Arranges comments into a forest. Input order is kept among siblings, so
/// callers pass comments oldest first. Comments whose parent is absent
/// from the input are dropped.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentResponse> {
    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        by_parent.entry(comment.parent_id).or_default().push(comment);
    }

    let roots = by_parent.remove(&ROOT_PARENT_ID).unwrap_or_default();
    roots
        .into_iter()
        .map(|root| attach_children(root, &mut by_parent))
        .collect()
}

fn attach_children(comment: Comment, by_parent: &mut HashMap<i64, Vec<Comment>>) -> CommentResponse {
    let children = by_parent.remove(&comment.id).unwrap_or_default();
    let mut node = CommentResponse::from(comment);
    node.children = children
        .into_iter()
        .map(|child| attach_children(child, by_parent))
        .collect();
    node
}

pub fn paginate_roots(roots: Vec<CommentResponse>, window: PageRequest) -> Paginated<CommentResponse> {
    let total = roots.len() as i64;
    let data = roots
        .into_iter()
        .skip(window.offset() as usize)
        .take(window.limit as usize)
        .collect();
    Paginated::new(data, total, window)
}

/// Ids connected to `target`: the target, all its descendants and all its
/// ancestors. Returned sorted.
pub fn collect_thread(links: &[CommentLink], target: i64) -> Vec<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut parents: HashMap<i64, i64> = HashMap::new();
    for link in links {
        children.entry(link.parent_id).or_default().push(link.id);
        parents.insert(link.id, link.parent_id);
    }

    let mut thread = HashSet::from([target]);

    let mut queue = VecDeque::from([target]);
    while let Some(id) = queue.pop_front() {
        for child in children.get(&id).into_iter().flatten() {
            if thread.insert(*child) {
                queue.push_back(*child);
            }
        }
    }

    let mut current = target;
    while let Some(&parent) = parents.get(&current) {
        if parent == ROOT_PARENT_ID || !thread.insert(parent) {
            break;
        }
        current = parent;
    }

    let mut ids: Vec<i64> = thread.into_iter().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roles::Role;
    use chrono::{Duration, Utc};

    fn comment(id: i64, parent_id: i64, user_id: Option<Uuid>) -> Comment {
        let created_at = Utc::now() + Duration::seconds(id);
        Comment {
            id,
            user_id,
            survey_id: Uuid::nil(),
            parent_id,
            is_resolved: false,
            name: format!("commenter {id}"),
            detail: "Atap bocor".to_string(),
            images: Vec::new(),
            resolved_by: None,
            resolved_at: None,
            created_by: "public".to_string(),
            updated_by: None,
            deleted_by: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    fn link(id: i64, parent_id: i64) -> CommentLink {
        CommentLink { id, parent_id }
    }

    fn actor(role: Role) -> Actor {
        let mut actor = Actor::guest(None);
        actor.user_id = Some(Uuid::new_v4());
        actor.role = role;
        actor
    }

    #[test]
    fn builds_nested_forest_in_creation_order() {
        let tree = build_comment_tree(vec![
            comment(1, 0, None),
            comment(2, 1, None),
            comment(3, 0, None),
            comment(4, 2, None),
            comment(5, 1, None),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        let replies: Vec<i64> = tree[0].children.iter().map(|node| node.id).collect();
        assert_eq!(replies, vec![2, 5]);
        assert_eq!(tree[0].children[0].children[0].id, 4);
        assert_eq!(tree[1].id, 3);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn orphans_are_left_out_of_the_forest() {
        let tree = build_comment_tree(vec![comment(1, 0, None), comment(9, 42, None)]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn pagination_counts_roots_only() {
        let tree = build_comment_tree(vec![
            comment(1, 0, None),
            comment(2, 1, None),
            comment(3, 0, None),
            comment(4, 0, None),
        ]);
        let page = paginate_roots(tree, PageRequest::normalize(Some(2), Some(2)));

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, 4);
    }

    #[test]
    fn resolving_a_middle_comment_covers_the_whole_chain() {
        // R(1) -> C1(2) -> C2(3)
        let links = [link(1, 0), link(2, 1), link(3, 2)];
        assert_eq!(collect_thread(&links, 2), vec![1, 2, 3]);
    }

    #[test]
    fn thread_excludes_sibling_roots_and_includes_sibling_branches() {
        // 1 -> {2 -> 4, 3}; 5 is a separate root; 6 replies to 5
        let links = [
            link(1, 0),
            link(2, 1),
            link(3, 1),
            link(4, 2),
            link(5, 0),
            link(6, 5),
        ];

        assert_eq!(collect_thread(&links, 4), vec![1, 2, 4]);
        assert_eq!(collect_thread(&links, 1), vec![1, 2, 3, 4]);
        assert_eq!(collect_thread(&links, 6), vec![5, 6]);
    }

    #[test]
    fn thread_walk_survives_malformed_cycles() {
        let links = [link(1, 2), link(2, 1)];
        assert_eq!(collect_thread(&links, 1), vec![1, 2]);
    }

    #[test]
    fn unknown_target_yields_only_itself() {
        assert_eq!(collect_thread(&[link(1, 0)], 99), vec![99]);
    }

    #[test]
    fn moderation_allowed_for_author_or_pic() {
        let author = actor(Role::Guest);
        let own = comment(1, 0, author.user_id);
        let foreign = comment(2, 0, Some(Uuid::new_v4()));

        assert!(can_moderate(&author, &own));
        assert!(!can_moderate(&author, &foreign));
        for role in [
            Role::Surveyor,
            Role::AdminBalai,
            Role::VerificatorBalai,
            Role::AdminEselon1,
            Role::VerificatorEselon1,
            Role::SuperAdmin,
        ] {
            assert!(can_moderate(&actor(role), &foreign), "{role:?}");
        }
    }

    #[test]
    fn only_the_author_deletes_a_comment() {
        let anonymous = comment(1, 0, None);
        for role in [
            Role::SuperAdmin,
            Role::AdminEselon1,
            Role::Surveyor,
            Role::VerificatorBalai,
        ] {
            assert!(!can_delete(&actor(role), &anonymous), "{role:?}");
        }

        let author = actor(Role::Surveyor);
        let own = comment(2, 0, author.user_id);
        assert!(can_delete(&author, &own));
        assert!(!can_delete(&actor(Role::SuperAdmin), &own));
    }

    #[test]
    fn draft_threads_are_hidden_outside_owner_scope() {
        use crate::models::surveys::StageStatus;
        use crate::usecases::surveys::tests::survey;

        let owner = Uuid::new_v4();
        let row = |submitted| SurveyRow {
            survey: survey(owner, submitted, StageStatus::Pending, StageStatus::Pending),
            user_email: None,
            owner_balai_id: Some(7),
        };

        let draft = row(false);
        assert!(!survey_visible(&SurveyScope::All, &draft));
        assert!(!survey_visible(&SurveyScope::Balai(7), &draft));
        assert!(!survey_visible(&SurveyScope::Owner(Uuid::new_v4()), &draft));
        assert!(survey_visible(&SurveyScope::Owner(owner), &draft));

        let submitted = row(true);
        assert!(survey_visible(&SurveyScope::All, &submitted));
        assert!(survey_visible(&SurveyScope::Balai(7), &submitted));
        assert!(!survey_visible(&SurveyScope::Balai(8), &submitted));
        assert!(!survey_visible(&SurveyScope::Nothing, &submitted));
    }

    #[test]
    fn comment_text_is_required() {
        assert!(validate_comment_text("Budi", "Atap bocor").is_ok());
        assert!(matches!(
            validate_comment_text(" ", "Atap bocor"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            validate_comment_text("Budi", ""),
            Err(AppError::ValidationError(_))
        ));
    }
}
