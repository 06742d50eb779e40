use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;
use tera::Context;

use super::{submitted, to_value};
use crate::context::Ctx;
use crate::errors::{AppError, AppResult};
use crate::types::{validate_form, FieldErrors, NewPost, Post, PostForm, Reply, ReplyForm};
use crate::views::HelperCall;

const LOGIN_REQUIRED: &str = "Vous devez être connecté pour publier un post";
const EDIT_FORBIDDEN: &str = "Vous ne pouvez pas modifier ce post";
const DELETE_FORBIDDEN: &str = "Vous ne pouvez pas supprimer ce post";

pub fn autoload() -> Vec<HelperCall> {
    vec![HelperCall::new("Html")]
}

pub fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Aucun post ne correspond à l'ID {}", id))
}

pub async fn find_post(ctx: &Ctx, id: i64) -> AppResult<Post> {
    ctx.state
        .storage
        .posts
        .find(id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn ensure_author(ctx: &Ctx, post: &Post, message: &str) -> AppResult<()> {
    let user = ctx.session.require_user(message)?;
    if user.id != post.user_id {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}

/// The post page, with its replies and the reply form.
pub fn render_show(
    ctx: &mut Ctx,
    post: &Post,
    replies: &[Reply],
    reply_form: &ReplyForm,
    errors: &FieldErrors,
) -> AppResult<HttpResponse> {
    let mut vars = Context::new();
    vars.insert("post", post);
    vars.insert("replies", replies);
    vars.insert("action", &format!("/posts/{}/replies", post.id));
    let viewer_id = ctx.session.user().map(|user| user.id);
    vars.insert("viewer_id", &viewer_id);
    vars.insert("is_author", &(viewer_id == Some(post.user_id)));

    let form = HelperCall::with_params("Form", vec![to_value(reply_form)?, to_value(errors)?]);

    let mut response = ctx.response(&autoload());
    response.set_title(&post.title);
    response.view("posts.show", &vars, &[form])?;
    response.finish(&mut ctx.session)
}

fn render_form(
    ctx: &mut Ctx,
    action: &str,
    title: &str,
    form: &PostForm,
    errors: &FieldErrors,
) -> AppResult<HttpResponse> {
    let mut vars = Context::new();
    vars.insert("method", "post");
    vars.insert("action", action);
    vars.insert("heading", title);

    let helper = HelperCall::with_params("Form", vec![to_value(form)?, to_value(errors)?]);

    let mut response = ctx.response(&autoload());
    response.set_title(title);
    response.view("posts.create", &vars, &[helper])?;
    response.finish(&mut ctx.session)
}

fn invalid_form(
    ctx: &mut Ctx,
    action: &str,
    title: &str,
    form: &PostForm,
    errors: &FieldErrors,
) -> AppResult<HttpResponse> {
    if ctx.request.is_json {
        return Ok(ctx
            .response(&autoload())
            .json(&json!({ "success": false, "errors": errors })));
    }
    render_form(ctx, action, title, form, errors)
}

// -------------------- Handlers --------------------

#[get("/")]
pub async fn home(mut ctx: Ctx) -> AppResult<HttpResponse> {
    let mut response = ctx.response(&autoload());
    response.view("posts.home", &Context::new(), &[])?;
    response.finish(&mut ctx.session)
}

#[get("/posts")]
pub async fn index(mut ctx: Ctx) -> AppResult<HttpResponse> {
    let posts = ctx.state.storage.posts.list_latest().await?;

    let mut response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&posts));
    }

    let mut vars = Context::new();
    vars.insert("posts", &posts);

    response.set_title("Tous les posts");
    response.view("posts.index", &vars, &[])?;
    response.finish(&mut ctx.session)
}

#[get("/posts/create")]
pub async fn create(mut ctx: Ctx) -> AppResult<HttpResponse> {
    ctx.session.require_user(LOGIN_REQUIRED)?;
    render_form(
        &mut ctx,
        "/posts",
        "Nouveau post",
        &PostForm::default(),
        &FieldErrors::new(),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[get("/posts/search")]
pub async fn search(mut ctx: Ctx, req: HttpRequest) -> AppResult<HttpResponse> {
    // An undecodable query string is searched as an empty one
    let query = web::Query::<SearchQuery>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let q = query.q.as_deref().map(str::trim).unwrap_or("");

    // An empty query matches nothing rather than everything
    let results = if q.is_empty() {
        Vec::new()
    } else {
        ctx.state.storage.posts.search_title(q).await?
    };

    let mut response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&results));
    }

    let mut vars = Context::new();
    vars.insert("results", &results);
    vars.insert("q", q);

    response.set_title("Recherche");
    response.view("posts.search", &vars, &[])?;
    response.finish(&mut ctx.session)
}

#[get("/posts/{id:\\d+}")]
pub async fn show(mut ctx: Ctx, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = find_post(&ctx, id).await?;

    if ctx.request.is_json {
        return Ok(ctx.response(&autoload()).json(&post));
    }

    let replies = ctx.state.storage.replies.for_post(id).await?;
    render_show(
        &mut ctx,
        &post,
        &replies,
        &ReplyForm::default(),
        &FieldErrors::new(),
    )
}

#[post("/posts")]
pub async fn store(mut ctx: Ctx, body: web::Bytes) -> AppResult<HttpResponse> {
    let user_id = ctx.session.require_user(LOGIN_REQUIRED)?.id;

    let form = submitted::<PostForm>(&ctx.request, &body).filtered();
    let form = match validate_form(form.clone()) {
        Ok(form) => form,
        Err(errors) => return invalid_form(&mut ctx, "/posts", "Nouveau post", &form, &errors),
    };

    let post = ctx
        .state
        .storage
        .posts
        .insert(NewPost::from_form(form, user_id))
        .await?;
    info!("Post {} created by user {}", post.id, user_id);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&post));
    }

    ctx.session.flash("Post bien créé");
    Ok(response.redirect("/posts/", &ctx.request, &ctx.session))
}

#[get("/posts/{id:\\d+}/edit")]
pub async fn edit(mut ctx: Ctx, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = find_post(&ctx, id).await?;
    ensure_author(&ctx, &post, EDIT_FORBIDDEN)?;

    let form = PostForm {
        title: post.title,
        content: post.content,
    };
    render_form(
        &mut ctx,
        &format!("/posts/{}", id),
        "Modifier le post",
        &form,
        &FieldErrors::new(),
    )
}

#[post("/posts/{id:\\d+}")]
pub async fn update(
    mut ctx: Ctx,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = find_post(&ctx, id).await?;
    ensure_author(&ctx, &post, EDIT_FORBIDDEN)?;

    let form = submitted::<PostForm>(&ctx.request, &body).filtered();
    let form = match validate_form(form.clone()) {
        Ok(form) => form,
        Err(errors) => {
            let action = format!("/posts/{}", id);
            return invalid_form(&mut ctx, &action, "Modifier le post", &form, &errors);
        }
    };

    let updated = ctx
        .state
        .storage
        .posts
        .update(id, &form)
        .await?
        .ok_or_else(|| not_found(id))?;
    info!("Post {} updated", id);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&updated));
    }

    ctx.session.flash("Post bien modifié");
    Ok(response.redirect("/posts/", &ctx.request, &ctx.session))
}

#[delete("/posts/{id:\\d+}")]
pub async fn destroy(mut ctx: Ctx, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let post = ctx.state.storage.posts.find(id).await?;

    // A missing post is reported the same way as someone else's post
    let is_author = match (&post, ctx.session.user()) {
        (Some(post), Some(user)) => post.user_id == user.id,
        _ => false,
    };
    if !is_author {
        return Err(AppError::Forbidden(DELETE_FORBIDDEN.to_string()));
    }

    ctx.state.storage.posts.delete(id).await?;
    let replies = ctx.state.storage.replies.delete_for_post(id).await?;
    info!("Post {} deleted with {} replies", id, replies);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&json!({ "success": true, "message": "Post bien supprimé" })));
    }

    ctx.session.flash("Post bien supprimé");
    Ok(response.redirect("/posts", &ctx.request, &ctx.session))
}
