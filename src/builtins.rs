//! Native runtime library registered into every fresh engine context.
//!
//! Submitted programs get a small host surface — time, hashing, base64,
//! identifiers, randomness. All of it is pure computation; nothing here
//! performs I/O or touches process state.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsNativeError, JsResult, JsValue, NativeFunction};
use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::{Rng, RngCore};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use uuid::Uuid;

/// Register the whole runtime library into `context`.
pub fn register(context: &mut Context) -> JsResult<()> {
    register_datetime(context)?;
    register_crypto(context)?;
    register_globals(context)?;
    Ok(())
}

fn register_datetime(context: &mut Context) -> JsResult<()> {
    let datetime = ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(datetime_now), js_string!("now"), 0)
        .function(
            NativeFunction::from_fn_ptr(datetime_now),
            js_string!("timestamp"),
            0,
        )
        .function(
            NativeFunction::from_fn_ptr(datetime_format),
            js_string!("format"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(datetime_iso_string),
            js_string!("isoString"),
            0,
        )
        .build();
    context.register_global_property(js_string!("datetime"), datetime, Attribute::all())?;
    Ok(())
}

fn register_crypto(context: &mut Context) -> JsResult<()> {
    let crypto = ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(crypto_md5), js_string!("md5"), 1)
        .function(NativeFunction::from_fn_ptr(crypto_sha1), js_string!("sha1"), 1)
        .function(
            NativeFunction::from_fn_ptr(crypto_sha256),
            js_string!("sha256"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(crypto_sha512),
            js_string!("sha512"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(crypto_hmac_sha256),
            js_string!("hmacSha256"),
            2,
        )
        .build();
    context.register_global_property(js_string!("crypto"), crypto, Attribute::all())?;
    Ok(())
}

fn register_globals(context: &mut Context) -> JsResult<()> {
    let functions: [(&str, fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>, usize); 6] = [
        ("btoa", base64_encode, 1),
        ("atob", base64_decode, 1),
        ("uuidv4", uuid_v4, 0),
        ("randomInt", random_int, 2),
        ("randomFloat", random_float, 0),
        ("randomBytes", random_bytes, 1),
    ];

    for (name, function, length) in functions {
        let object = FunctionObjectBuilder::new(
            context.realm(),
            NativeFunction::from_fn_ptr(function),
        )
        .name(js_string!(name))
        .length(length)
        .constructor(false)
        .build();
        context.register_global_property(js_string!(name), object, Attribute::all())?;
    }
    Ok(())
}

fn datetime_now(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(Utc::now().timestamp_millis()))
}

fn datetime_format(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let fmt = args
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|| "%Y-%m-%d %H:%M:%S".to_string());
    Ok(JsValue::from(js_string!(Utc::now().format(&fmt).to_string())))
}

fn datetime_iso_string(
    _this: &JsValue,
    _args: &[JsValue],
    _ctx: &mut Context,
) -> JsResult<JsValue> {
    let iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(JsValue::from(js_string!(iso)))
}

fn digest_hex<D: Digest>(input: &str) -> String {
    hex::encode(D::digest(input.as_bytes()))
}

fn crypto_md5(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(digest_hex::<Md5>(&string_arg(
        args, 0
    )))))
}

fn crypto_sha1(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(digest_hex::<Sha1>(&string_arg(
        args, 0
    )))))
}

fn crypto_sha256(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(digest_hex::<Sha256>(&string_arg(
        args, 0
    )))))
}

fn crypto_sha512(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(digest_hex::<Sha512>(&string_arg(
        args, 0
    )))))
}

fn crypto_hmac_sha256(
    _this: &JsValue,
    args: &[JsValue],
    _ctx: &mut Context,
) -> JsResult<JsValue> {
    let key = string_arg(args, 0);
    let message = string_arg(args, 1);
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| JsNativeError::typ().with_message("Invalid HMAC key"))?;
    mac.update(message.as_bytes());
    let result = mac.finalize().into_bytes();
    Ok(JsValue::from(js_string!(hex::encode(result))))
}

fn base64_encode(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = string_arg(args, 0);
    Ok(JsValue::from(js_string!(
        BASE64_STANDARD.encode(input.as_bytes())
    )))
}

fn base64_decode(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = string_arg(args, 0);
    let decoded = BASE64_STANDARD
        .decode(input.as_bytes())
        .map_err(|_| JsNativeError::typ().with_message("Invalid base64 input"))?;
    let text = String::from_utf8(decoded)
        .map_err(|_| JsNativeError::typ().with_message("Invalid UTF-8 string"))?;
    Ok(JsValue::from(js_string!(text)))
}

fn uuid_v4(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(Uuid::new_v4().to_string())))
}

fn random_int(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let min = args.first().and_then(|v| v.as_number()).unwrap_or(0.0) as i64;
    let max = args.get(1).and_then(|v| v.as_number()).unwrap_or(100.0) as i64;
    if min > max {
        return Err(JsNativeError::range()
            .with_message("min should be <= max")
            .into());
    }
    let value = rand::thread_rng().gen_range(min..=max);
    Ok(JsValue::from(value as f64))
}

fn random_float(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let value: f64 = rand::thread_rng().gen();
    Ok(JsValue::from(value))
}

fn random_bytes(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let len = args.first().and_then(|v| v.as_number()).unwrap_or(16.0) as usize;
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(JsValue::from(js_string!(hex::encode(bytes))))
}

fn string_arg(args: &[JsValue], index: usize) -> String {
    args.get(index)
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_default()
}
