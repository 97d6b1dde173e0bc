mod config;

use std::sync::{Arc, RwLock};

use actix_cors::Cors;
use actix_web::{get, middleware, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};

use config::ServerConfig;
use lm_trie_core::io::{get_filename, list_files};
use lm_trie_core::{LogMath, Trie};

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

/// Query of `/v1/prob`: comma separated words, the scored word last.
#[derive(Deserialize)]
struct ProbQuery {
	words: Option<String>,
}

#[derive(Deserialize)]
struct ScoreQuery {
	sentence: Option<String>,
}

#[derive(Deserialize)]
struct NgramsQuery {
	order: Option<usize>,
}

#[derive(Serialize)]
struct ProbResponse {
	word: String,
	log10_prob: f64,
	n_used: usize,
}

#[derive(Serialize)]
struct ScoreResponse {
	tokens: usize,
	log10_prob: f64,
}

#[derive(Default)]
struct LoadedModel {
	name: Option<String>,
	trie: Option<Arc<Trie>>,
}

struct SharedData {
	config: ServerConfig,
	model: RwLock<LoadedModel>,
}

impl SharedData {
	/// The loaded trie, retained so the lock is not held while querying.
	fn trie(&self) -> Result<Arc<Trie>, HttpResponse> {
		let model = self
			.model
			.read()
			.map_err(|_| HttpResponse::InternalServerError().body("Model lock failed"))?;
		match &model.trie {
			Some(trie) => Ok(Trie::retain(trie)),
			None => Err(HttpResponse::Conflict().body("No model loaded")),
		}
	}
}

#[get("/v1/models")]
async fn get_models(data: web::Data<SharedData>) -> impl Responder {
	match list_files(&data.config.data_dir, "arpa") {
		Ok(files) => {
			let names: Vec<String> = files.iter().filter_map(|f| get_filename(f).ok()).collect();
			HttpResponse::Ok().body(names.join("\n"))
		}
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

#[get("/v1/loaded_model")]
async fn get_loaded_model(data: web::Data<SharedData>) -> impl Responder {
	let model = match data.model.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let order = model.trie.as_ref().map(|t| t.order());
	HttpResponse::Ok().json(serde_json::json!({ "name": model.name, "order": order }))
}

#[put("/v1/load_model")]
async fn put_model(data: web::Data<SharedData>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};
	let Some(path) = data.config.model_path(&name) else {
		return HttpResponse::BadRequest().body("Invalid model name");
	};

	let loaded = web::block(move || Trie::open(path, Arc::new(LogMath::default()))).await;
	let trie = match loaded {
		Ok(Ok(trie)) => trie,
		Ok(Err(e)) => {
			error!("Failed to load model '{}': {}", name, e);
			return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}"));
		}
		Err(_) => return HttpResponse::InternalServerError().body("Model loading was cancelled"),
	};

	let mut model = match data.model.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	info!("Model '{}' loaded ({} nodes)", name, trie.len());
	model.trie = Some(Arc::new(trie));
	model.name = Some(name);

	HttpResponse::Ok().body("Model loaded successfully")
}

#[get("/v1/prob")]
async fn get_prob(data: web::Data<SharedData>, query: web::Query<ProbQuery>) -> impl Responder {
	let trie = match data.trie() {
		Ok(t) => t,
		Err(response) => return response,
	};
	let words: Vec<&str> = query
		.words
		.as_deref()
		.unwrap_or("")
		.split(',')
		.map(str::trim)
		.filter(|w| !w.is_empty())
		.collect();
	let Some((word, context)) = words.split_last() else {
		return HttpResponse::BadRequest().body("Missing words");
	};

	let history: Vec<&str> = context.iter().rev().copied().collect();
	let (prob, n_used) = trie.prob_words(word, &history);
	HttpResponse::Ok().json(ProbResponse {
		word: word.to_string(),
		log10_prob: trie.lmath().log_to_log10(prob),
		n_used,
	})
}

#[get("/v1/score")]
async fn get_score(data: web::Data<SharedData>, query: web::Query<ScoreQuery>) -> impl Responder {
	let trie = match data.trie() {
		Ok(t) => t,
		Err(response) => return response,
	};
	let tokens: Vec<&str> = query.sentence.as_deref().unwrap_or("").split_whitespace().collect();
	if tokens.is_empty() {
		return HttpResponse::BadRequest().body("Missing sentence");
	}

	let score = trie.score_sentence(&tokens);
	HttpResponse::Ok().json(ScoreResponse {
		tokens: tokens.len(),
		log10_prob: trie.lmath().log_to_log10(score),
	})
}

#[get("/v1/ngrams")]
async fn get_ngrams(data: web::Data<SharedData>, query: web::Query<NgramsQuery>) -> impl Responder {
	let trie = match data.trie() {
		Ok(t) => t,
		Err(response) => return response,
	};
	let order = match query.order {
		Some(n) if n >= 1 => n,
		_ => return HttpResponse::BadRequest().body("Order must be at least 1"),
	};

	let mut out = Vec::new();
	match trie.write_ngrams(order, &mut out) {
		Ok(_) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(out),
		Err(e) => HttpResponse::InternalServerError().body(format!("Failed to list n-grams: {e}")),
	}
}

#[get("/v1/arpa")]
async fn get_arpa(data: web::Data<SharedData>) -> impl Responder {
	let trie = match data.trie() {
		Ok(t) => t,
		Err(response) => return response,
	};

	let mut out = Vec::new();
	match trie.write_arpa(&mut out) {
		Ok(()) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(out),
		Err(e) => HttpResponse::InternalServerError().body(format!("Failed to write model: {e}")),
	}
}

/// Main entry point for the server.
///
/// Starts with no model; `PUT /v1/load_model` loads one from the data
/// directory. Queries take a read lock only long enough to retain the trie.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let config = ServerConfig::from_env();
	let bind = (config.host.clone(), config.port);
	info!("Serving models from {} on {}:{}", config.data_dir.display(), bind.0, bind.1);

	let shared_data = web::Data::new(SharedData {
		config,
		model: RwLock::new(LoadedModel::default()),
	});

	HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_models)
			.service(get_loaded_model)
			.service(put_model)
			.service(get_prob)
			.service(get_score)
			.service(get_ngrams)
			.service(get_arpa)
	})
		.bind(bind)?
		.run()
		.await
}
