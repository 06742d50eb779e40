use actix_web::{delete, post, web, HttpResponse};
use log::info;
use serde_json::json;

use super::posts::{autoload, find_post, render_show};
use super::submitted;
use crate::context::Ctx;
use crate::errors::{AppError, AppResult};
use crate::types::{validate_form, NewReply, ReplyForm};

const LOGIN_REQUIRED: &str = "Vous devez être connecté pour répondre";
const DELETE_FORBIDDEN: &str = "Vous ne pouvez pas supprimer cette réponse";

#[post("/posts/{id:\\d+}/replies")]
pub async fn store(
    mut ctx: Ctx,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let user_id = ctx.session.require_user(LOGIN_REQUIRED)?.id;
    let post = find_post(&ctx, post_id).await?;

    let form = submitted::<ReplyForm>(&ctx.request, &body).filtered();
    let form = match validate_form(form.clone()) {
        Ok(form) => form,
        Err(errors) => {
            if ctx.request.is_json {
                return Ok(ctx
                    .response(&autoload())
                    .json(&json!({ "success": false, "errors": errors })));
            }
            let replies = ctx.state.storage.replies.for_post(post_id).await?;
            return render_show(&mut ctx, &post, &replies, &form, &errors);
        }
    };

    let reply = ctx
        .state
        .storage
        .replies
        .insert(NewReply {
            post_id,
            content: form.content,
            user_id,
        })
        .await?;
    info!("Reply {} added to post {}", reply.id, post_id);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&reply));
    }

    ctx.session.flash("Réponse publiée");
    Ok(response.redirect(&format!("/posts/{}", post_id), &ctx.request, &ctx.session))
}

#[delete("/replies/{id:\\d+}")]
pub async fn destroy(mut ctx: Ctx, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let reply = ctx.state.storage.replies.find(id).await?;

    let reply = match (reply, ctx.session.user()) {
        (Some(reply), Some(user)) if reply.user_id == user.id => reply,
        _ => return Err(AppError::Forbidden(DELETE_FORBIDDEN.to_string())),
    };

    ctx.state.storage.replies.delete(id).await?;
    info!("Reply {} deleted", id);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&json!({ "success": true, "message": "Réponse bien supprimée" })));
    }

    ctx.session.flash("Réponse bien supprimée");
    Ok(response.redirect(
        &format!("/posts/{}", reply.post_id),
        &ctx.request,
        &ctx.session,
    ))
}
