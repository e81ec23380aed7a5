//! Post creation and listing.

use actix_web::{HttpResponse, web};

use solace_core::domain::Post;
use solace_shared::dto::{CreatePostRequest, CreatePostResponse, PostResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Reader-facing view of a post. Anonymous posts never reveal their author.
fn to_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        user_id: (!post.anonymous).then_some(post.user_id),
        content: post.content,
        anonymous: post.anonymous,
        created_at: post.created_at,
    }
}

/// POST /posts - behind the Auth Gate
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // The author is whoever the token says, never the body.
    if let Some(claimed) = req.user_id.as_deref().filter(|c| *c != identity.subject) {
        tracing::warn!(
            subject = %identity.subject,
            claimed = %claimed,
            "Ignoring client-supplied author id"
        );
    }

    let post = state
        .within_deadline(
            state
                .posts
                .create_post(&identity.subject, req.content, req.anonymous),
        )
        .await?;

    Ok(HttpResponse::Created().json(CreatePostResponse {
        message: "Post created successfully".to_string(),
        id: post.id,
    }))
}

/// GET /posts
pub async fn list_posts(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.within_deadline(state.posts.list_posts()).await?;

    let body: Vec<PostResponse> = posts.into_iter().map(to_response).collect();
    Ok(HttpResponse::Ok().json(body))
}
