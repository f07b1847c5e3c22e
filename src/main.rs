use std::env;

use log::*;
use pretty_env_logger;
use warp::Filter;
use warp::filters::log::Info;

use origination_api::api;
use origination_api::db;

#[tokio::main]
async fn main() {
	if env::var("RUST_LOG").is_err() {
		env::set_var("RUST_LOG", "info");
	}
	pretty_env_logger::init();

	let log = warp::log::custom(|info: Info| {
		info!(
			target: "origination::api",
			"\"{} {} {:?}\" \t{} {} {:?}",
			info.method(),
			info.path(),
			info.version(),
			info.status().canonical_reason().unwrap_or_else(|| "-"),
			info.status().as_u16(),
			info.elapsed(),
		);
	});

	let pool = db::pg_connection();
	let routes = api::routes(pool).with(log);

	info!("listening on 127.0.0.1:3030");
	warp::serve(routes).run(([127, 0, 0, 1], 3030)).await;
}
