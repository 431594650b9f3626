//! # Programa CGI de ejemplo
//! src/bin/hello_cgi.rs
//!
//! Copiarlo a `<root>/cgi-bin/hello` y pedir `GET /cgi-bin/hello?nombre`.
//! Escribe su propio `Content-Type`, la línea vacía y una página con la
//! hora y el `QUERY_STRING` recibido.

use std::env;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> io::Result<()> {
    let query = env::var("QUERY_STRING").unwrap_or_default();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let body = format!(
        "<html><head><title>hello</title></head><body>\r\n\
         <p>Welcome to hello_cgi</p>\r\n\
         <p>Seconds since the epoch: {}</p>\r\n\
         <p>QUERY_STRING: {}</p>\r\n\
         </body></html>\r\n",
        now, query
    );

    let mut stdout = io::stdout().lock();
    write!(stdout, "Content-Type: text/html\r\n")?;
    write!(stdout, "Content-Length: {}\r\n\r\n", body.len())?;
    stdout.write_all(body.as_bytes())?;
    stdout.flush()
}
