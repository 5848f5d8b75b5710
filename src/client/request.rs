use reqwest::{
    header::{HeaderMap, AUTHORIZATION},
    multipart::{Form, Part},
    Client, Method, RequestBuilder,
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct MultipartPart {
    pub name: String,
    pub value: PartValue,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::File {
                file_name: file_name.into(),
                mime: None,
                bytes,
            },
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        if let PartValue::File { mime: slot, .. } = &mut self.value {
            *slot = Some(mime.into());
        }
        self
    }
}

/// Bodies are kept as plain data so a retried request can be rebuilt;
/// a streamed `reqwest` body could only be sent once.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartPart>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// A fresh builder for one attempt. Any caller-supplied `Authorization`
    /// header is replaced by `bearer`.
    pub fn build(
        &self,
        client: &Client,
        base_url: &str,
        bearer: Option<&str>,
    ) -> Result<RequestBuilder, reqwest::Error> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let mut headers = self.headers.clone();
        headers.remove(AUTHORIZATION);

        let mut builder = client.request(self.method.clone(), url).headers(headers);
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        Ok(match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        })
    }
}

fn build_form(parts: &[MultipartPart]) -> Result<Form, reqwest::Error> {
    let mut form = Form::new();
    for part in parts {
        form = match &part.value {
            PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
            PartValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime)?;
                }
                form.part(part.name.clone(), file)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn bearer_replaces_caller_authorization() {
        let mut request = ApiRequest::get("/riders").query("city", "Rabat");
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));

        let built = request
            .build(&Client::new(), "http://localhost:8000/", Some("real"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(built.url().as_str(), "http://localhost:8000/riders?city=Rabat");
        assert_eq!(built.headers()[AUTHORIZATION], "Bearer real");
    }

    #[test]
    fn requests_without_token_carry_no_authorization() {
        let built = ApiRequest::post("/token")
            .form([("username", "a"), ("password", "b")])
            .build(&Client::new(), "http://localhost:8000", None)
            .unwrap()
            .build()
            .unwrap();
        assert!(built.headers().get(AUTHORIZATION).is_none());
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(&b"username=a&password=b"[..])
        );
    }

    #[test]
    fn multipart_bodies_can_be_built_repeatedly() {
        let request = ApiRequest::post("/inspections").multipart(vec![
            MultipartPart::text("location", "Agdal"),
            MultipartPart::file("image", "helmet.jpg", vec![1, 2, 3]).with_mime("image/jpeg"),
        ]);
        let client = Client::new();
        for _ in 0..2 {
            let built = request
                .build(&client, "http://localhost:8000", Some("t"))
                .unwrap()
                .build()
                .unwrap();
            let content_type = built.headers()[reqwest::header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .to_string();
            assert!(content_type.starts_with("multipart/form-data"));
        }
    }
}
